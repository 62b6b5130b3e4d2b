pub mod observer;
pub mod runner;
