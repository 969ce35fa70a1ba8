// Library module for dirsum
// Re-exports the digest engine for use in integration tests and external crates

pub mod digest;
