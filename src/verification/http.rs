//! `reqwest`-backed [`VerificationService`] talking to the verifier HTTP API.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{CreditBudget, VerificationResult};
use crate::verification::service::{
    CheckOutcome, SaveBatchRequest, SavedBatch, VerificationService,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Instant;
use url::Url;

const CHECK_EMAIL_PATH: &str = "verifier/api/check-email/";
const CHECK_CREDITS_PATH: &str = "verifier/api/check-credits/";
const BATCH_VERIFY_PATH: &str = "verifier/api/batch-verify/";

/// Longest slice of a non-JSON error body kept in error messages.
const MAX_BODY_SNIPPET: usize = 200;

pub struct HttpVerificationService {
    client: reqwest::Client,
    base_url: Url,
    last_credits: Mutex<Option<CreditBudget>>,
}

impl HttpVerificationService {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&format!("{}/", config.api_base_url.trim_end_matches('/')))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Token {}", token.trim()))
                .map_err(|e| AppError::Initialization(format!("Invalid API token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Initialization(format!("Failed to build HTTP client: {}", e)))?;

        tracing::debug!(target: "http_client", "HTTP client ready for {}", base_url);
        Ok(Self {
            client,
            base_url,
            last_credits: Mutex::new(None),
        })
    }

    /// The most recent credit balance seen in any response, if any.
    pub fn cached_credits(&self) -> Option<CreditBudget> {
        *self.last_credits.lock()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn remember_credits(&self, remaining: Option<u64>) {
        if let Some(remaining) = remaining {
            *self.last_credits.lock() = Some(CreditBudget::new(remaining));
        }
    }
}

#[async_trait]
impl VerificationService for HttpVerificationService {
    async fn check_email(&self, email: &str) -> Result<CheckOutcome> {
        let url = self.endpoint(CHECK_EMAIL_PATH)?;
        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(
            target: "http_client",
            "check-email {} -> HTTP {} in {:.2?}",
            email,
            status.as_u16(),
            started.elapsed()
        );

        let decoded = decode_check_email(status, &body);
        match &decoded {
            Ok(outcome) => self.remember_credits(outcome.remaining_credits),
            Err(AppError::InsufficientCredits {
                current_credits, ..
            }) => self.remember_credits(Some(current_credits.unwrap_or(0))),
            Err(_) => {}
        }
        decoded
    }

    async fn check_credits(&self) -> Result<CreditBudget> {
        let url = self.endpoint(CHECK_CREDITS_PATH)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let budget = decode_credits(status, &body)?;
        self.remember_credits(Some(budget.remaining));
        tracing::debug!(target: "http_client", "check-credits -> {} remaining", budget.remaining);
        Ok(budget)
    }

    async fn save_batch(&self, request: &SaveBatchRequest) -> Result<SavedBatch> {
        let url = self.endpoint(BATCH_VERIFY_PATH)?;
        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        decode_saved_batch(status, &body)
    }
}

/// Interprets a check-email response.
///
/// 402 is the server's "out of credits" refusal; any other non-2xx status or a
/// body with `success: false` is a service error; a 2xx body that does not
/// describe a result is malformed.
pub(crate) fn decode_check_email(status: StatusCode, body: &str) -> Result<CheckOutcome> {
    if status == StatusCode::PAYMENT_REQUIRED {
        let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let message = string_field(&parsed, &["message", "error"])
            .unwrap_or_else(|| "Insufficient verify credits".to_string());
        return Err(AppError::InsufficientCredits {
            message,
            current_credits: parsed.get("current_credits").and_then(Value::as_u64),
        });
    }
    if !status.is_success() {
        return Err(service_error(status, body));
    }

    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| AppError::MalformedResponse(format!("check-email body is not JSON: {}", e)))?;
    if parsed.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(AppError::Service {
            status: status.as_u16(),
            message: string_field(&parsed, &["error", "message", "details"])
                .unwrap_or_else(|| "Verification failed".to_string()),
        });
    }

    let remaining_credits = parsed.get("remaining_credits").and_then(Value::as_u64);
    let result: VerificationResult = serde_json::from_value(parsed)
        .map_err(|e| AppError::MalformedResponse(format!("Unexpected check-email body: {}", e)))?;
    Ok(CheckOutcome {
        result,
        remaining_credits,
    })
}

pub(crate) fn decode_credits(status: StatusCode, body: &str) -> Result<CreditBudget> {
    if !status.is_success() {
        return Err(service_error(status, body));
    }
    serde_json::from_str(body)
        .map_err(|e| AppError::MalformedResponse(format!("Unexpected check-credits body: {}", e)))
}

pub(crate) fn decode_saved_batch(status: StatusCode, body: &str) -> Result<SavedBatch> {
    if !status.is_success() {
        return Err(service_error(status, body));
    }
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| AppError::MalformedResponse(format!("batch-verify body is not JSON: {}", e)))?;
    if parsed.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(AppError::Persistence(
            string_field(&parsed, &["error", "message"])
                .unwrap_or_else(|| "History store did not confirm the save".to_string()),
        ));
    }
    serde_json::from_value(parsed)
        .map_err(|e| AppError::MalformedResponse(format!("Unexpected batch-verify body: {}", e)))
}

fn service_error(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| string_field(&v, &["message", "error", "detail", "details"]))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("no response body")
                    .to_string()
            } else {
                trimmed.chars().take(MAX_BODY_SNIPPET).collect()
            }
        });
    AppError::Service {
        status: status.as_u16(),
        message,
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::VerificationStatus;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Reads one HTTP/1.1 request, head and body.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answers one connection per canned response and returns the requests received.
    async fn canned_server(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut stream).await);
                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            requests
        });
        (base_url, handle)
    }

    fn service_for(base_url: String) -> HttpVerificationService {
        let config = Config {
            api_base_url: base_url,
            api_token: Some("abc123".to_string()),
            ..Config::default()
        };
        HttpVerificationService::new(&config).unwrap()
    }

    #[tokio::test]
    async fn check_email_sends_token_and_caches_credits() {
        let (base_url, server) = canned_server(vec![
            (
                200,
                r#"{"success": true, "email": "jane@example.com", "status": "valid", "score": 0.9, "remaining_credits": 41}"#,
            ),
            (
                402,
                r#"{"error": "Insufficient verify credits", "current_credits": 0}"#,
            ),
        ])
        .await;
        let service = service_for(base_url);

        let outcome = service.check_email("jane@example.com").await.unwrap();
        assert_eq!(outcome.remaining_credits, Some(41));
        assert_eq!(service.cached_credits(), Some(CreditBudget::new(41)));

        let err = service.check_email("sam@example.com").await.unwrap_err();
        assert!(err.is_credit_exhaustion());
        assert_eq!(service.cached_credits(), Some(CreditBudget::new(0)));

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("POST /verifier/api/check-email/ HTTP/1.1"));
        assert!(requests[0]
            .to_ascii_lowercase()
            .contains("authorization: token abc123\r\n"));
        assert!(requests[0].contains(r#""email":"jane@example.com""#));
        assert!(requests[1].contains("sam@example.com"));
    }

    #[tokio::test]
    async fn check_credits_updates_the_cache() {
        let (base_url, server) =
            canned_server(vec![(200, r#"{"user": "jane", "verify_credits": 7}"#)]).await;
        let service = service_for(base_url);

        let budget = service.check_credits().await.unwrap();
        assert_eq!(budget.remaining, 7);
        assert_eq!(service.cached_credits(), Some(budget));

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("GET /verifier/api/check-credits/ HTTP/1.1"));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_retryable_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let service = service_for(base_url);

        let err = service.check_email("jane@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::Request(_)));
        assert!(err.is_retryable());
        assert!(service.cached_credits().is_none());
    }

    #[test]
    fn decodes_successful_check() {
        let body = r#"{
            "success": true,
            "email": "jane@example.com",
            "domain": "example.com",
            "status": "valid",
            "reason": "",
            "is_disposable": false,
            "is_free_provider": true,
            "is_role_based": false,
            "is_catch_all": false,
            "is_blacklisted": false,
            "score": 0.92,
            "spf": "v=spf1 include:_spf.example.com ~all",
            "dkim": null,
            "dmarc": "v=DMARC1; p=reject",
            "mx_host": "mx.example.com",
            "remaining_credits": 41
        }"#;
        let outcome = decode_check_email(StatusCode::OK, body).unwrap();
        assert_eq!(outcome.remaining_credits, Some(41));
        assert_eq!(outcome.result.status, VerificationStatus::Valid);
        assert!(outcome.result.is_free_provider);
        assert_eq!(outcome.result.domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn payment_required_is_insufficient_credits() {
        let body = r#"{"error": "Insufficient verify credits", "message": "You need at least 1 verify credit", "current_credits": 0}"#;
        match decode_check_email(StatusCode::PAYMENT_REQUIRED, body) {
            Err(AppError::InsufficientCredits {
                message,
                current_credits,
            }) => {
                assert_eq!(message, "You need at least 1 verify credit");
                assert_eq!(current_credits, Some(0));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let bare = decode_check_email(StatusCode::PAYMENT_REQUIRED, "").unwrap_err();
        assert!(bare.is_credit_exhaustion());
    }

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        let err = decode_check_email(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error": "Email verification failed", "details": "timeout"}"#,
        )
        .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Email verification failed"));

        let err = decode_check_email(StatusCode::BAD_REQUEST, "<html>nope</html>").unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("<html>nope</html>"));
    }

    #[test]
    fn malformed_bodies() {
        let err = decode_check_email(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));

        let err = decode_check_email(StatusCode::OK, r#"{"success": true}"#).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));

        let err =
            decode_check_email(StatusCode::OK, r#"{"success": false, "error": "bad domain"}"#)
                .unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("bad domain"));
    }

    #[test]
    fn decodes_credits_and_saved_batches() {
        let budget = decode_credits(
            StatusCode::OK,
            r#"{"user": "jane", "verify_credits": 7, "email_credits": 3}"#,
        )
        .unwrap();
        assert_eq!(budget.remaining, 7);
        assert!(decode_credits(StatusCode::NOT_FOUND, r#"{"error": "User profile not found"}"#)
            .is_err());

        let saved = decode_saved_batch(
            StatusCode::OK,
            r#"{"success": true, "history_id": 9, "summary": {"total": 2, "valid": 1, "invalid": 0, "catchall": 1, "success_rate": 100.0}}"#,
        )
        .unwrap();
        assert_eq!(saved.history_id, Some(9));
        assert_eq!(saved.summary.catch_all, 1);

        let err = decode_saved_batch(StatusCode::OK, r#"{"success": false}"#).unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    #[test]
    fn endpoints_respect_base_path() {
        let config = Config {
            api_base_url: "https://verify.example.com/app".to_string(),
            ..Config::default()
        };
        let service = HttpVerificationService::new(&config).unwrap();
        assert_eq!(
            service.endpoint(CHECK_EMAIL_PATH).unwrap().as_str(),
            "https://verify.example.com/app/verifier/api/check-email/"
        );
        assert!(service.cached_credits().is_none());
    }
}
