pub mod config;
pub mod pipeline;

pub use config::{ConfigError, ScanConfig, ScanConfigUpdate};
pub use pipeline::label::{estimate_doses_per_day, parse_label, ParsedMedicationData};
pub use pipeline::safety::{redact, Redacted};
pub use pipeline::scan::{
    assess_quality, detect_fields, is_complete, start_live_scan, DetectedField, FrameAccumulator,
    FrameSource, LiveScanHandle, QualityAssessment, RecognitionError, RecognizedFrame, ScanError,
    ScanOutcome, ScanProgress, ScanSession,
};

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
