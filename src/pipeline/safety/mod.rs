pub mod redact;

pub use redact::{redact, Redacted};
