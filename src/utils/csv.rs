//! Minimal CSV reading and writing for address lists and exports.
//!
//! Handles quoted fields, doubled quotes and line breaks inside quotes. Records
//! may end in `\n` or `\r\n`. A quote only opens a quoted field at the start
//! of the field; anywhere else it is kept as a literal character.

/// Parses CSV text into records. Blank lines are skipped.
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }
    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.iter().all(|f| f.trim().is_empty());
    if !blank {
        records.push(record);
    }
}

/// Quotes a field unconditionally, doubling embedded quotes.
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Renders records as CSV with every field quoted and CRLF line endings.
pub fn write_records<R, F>(records: R) -> String
where
    R: IntoIterator<Item = F>,
    F: IntoIterator,
    F::Item: AsRef<str>,
{
    records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|field| quote_field(field.as_ref()))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quotes_and_line_endings() {
        let text = "name,email\r\n\"Doe, Jane\",jane@x.com\r\n\r\n\"say \"\"hi\"\"\",\"multi\nline\"\n";
        let records = parse_records(text);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], vec!["name", "email"]);
        assert_eq!(records[1], vec!["Doe, Jane", "jane@x.com"]);
        assert_eq!(records[2], vec!["say \"hi\"", "multi\nline"]);
    }

    #[test]
    fn stray_quote_inside_field_is_literal() {
        let records = parse_records("name,email\nBob 5\" tall,bob@x.com\nAmy,amy@x.com\n");
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], vec!["Bob 5\" tall", "bob@x.com"]);
        assert_eq!(records[2], vec!["Amy", "amy@x.com"]);
    }

    #[test]
    fn writer_output_reads_back() {
        let rows = vec![vec!["a", "b,c"], vec!["\"q\"", ""]];
        let text = write_records(rows.clone());
        assert_eq!(text, "\"a\",\"b,c\"\r\n\"\"\"q\"\"\",\"\"");
        assert_eq!(parse_records(&text), rows);
    }
}
