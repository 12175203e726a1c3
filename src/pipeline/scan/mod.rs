pub mod accumulator;
pub mod completion;
pub mod driver;
pub mod fields;
pub(crate) mod patterns;
pub mod quality;
pub mod session;
pub mod types;

pub use accumulator::*;
pub use completion::*;
pub use driver::{start_live_scan, FrameSource, LiveScanHandle};
pub use fields::detect_fields;
pub use quality::assess_quality;
pub use session::*;
pub use types::*;

use thiserror::Error;

/// Scan pipeline errors. Frame processing itself never fails.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Malformed recognition frame: {0}")]
    InvalidFrame(#[source] serde_json::Error),

    #[error("Capture loop task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Failure reported by the external text-recognition collaborator for one
/// frame. Never fatal to a session: the frame is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("Text recognition unavailable: {0}")]
    Unavailable(String),

    #[error("Text recognition failed: {0}")]
    Failed(String),
}
