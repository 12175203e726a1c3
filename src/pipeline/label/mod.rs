pub mod parser;
pub mod schedule;
pub mod types;

pub use parser::{parse_label, parse_label_date};
pub use schedule::estimate_doses_per_day;
pub use types::ParsedMedicationData;
