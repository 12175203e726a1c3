pub mod label; // Structured record from final label text
pub mod safety; // PHI redaction at the logging boundary
pub mod scan; // Live multi-frame capture and completion
