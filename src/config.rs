//! Scan thresholds.
//!
//! One `ScanConfig` value drives every downstream decision: completion,
//! quality assessment and debug logging. It is an owned value, cloned into
//! each `FrameAccumulator`; there is no process-wide copy and nothing is
//! persisted, so a restart always comes back to the compiled defaults.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::scan::DetectedField;

/// Application-level constants
pub const APP_NAME: &str = "Medscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "medscan=debug"
    } else {
        "medscan=info"
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Recognized scan options. Serialized with the camelCase option names the
/// host application uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Minimum running confidence (0.0-1.0) for a stable completion.
    #[serde(rename = "minConfidenceThreshold")]
    pub min_confidence: f32,
    pub min_unique_lines: usize,
    /// Minimum accumulated text length, in characters.
    pub min_text_length: usize,
    pub required_fields: BTreeSet<DetectedField>,
    /// How many of `required_fields` must be detected for an acceptable scan.
    pub min_required_field_count: usize,
    /// How long the accumulated text must stay unchanged.
    pub stability_duration_ms: u64,
    /// Forced-completion deadline, measured from session start.
    pub max_scan_time_ms: u64,
    pub frame_capture_interval_ms: u64,
    #[serde(rename = "enableDebugLogging")]
    pub debug_logging: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            min_unique_lines: 5,
            min_text_length: 100,
            required_fields: BTreeSet::from([
                DetectedField::DrugName,
                DetectedField::Strength,
                DetectedField::Dosage,
                DetectedField::Frequency,
            ]),
            min_required_field_count: 2,
            stability_duration_ms: 1500,
            max_scan_time_ms: 30_000,
            frame_capture_interval_ms: 500,
            debug_logging: cfg!(debug_assertions),
        }
    }
}

/// Partial update. Absent options keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScanConfigUpdate {
    #[serde(rename = "minConfidenceThreshold")]
    pub min_confidence: Option<f32>,
    pub min_unique_lines: Option<usize>,
    pub min_text_length: Option<usize>,
    pub required_fields: Option<BTreeSet<DetectedField>>,
    pub min_required_field_count: Option<usize>,
    pub stability_duration_ms: Option<u64>,
    pub max_scan_time_ms: Option<u64>,
    pub frame_capture_interval_ms: Option<u64>,
    #[serde(rename = "enableDebugLogging")]
    pub debug_logging: Option<bool>,
}

// ═══════════════════════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════════════════════

impl ScanConfig {
    /// Shallow-merge `update` into this config.
    ///
    /// The merged value is validated before it replaces `self`; on error the
    /// current config is left untouched.
    pub fn update(&mut self, update: ScanConfigUpdate) -> Result<(), ConfigError> {
        let mut merged = self.clone();
        if let Some(v) = update.min_confidence {
            merged.min_confidence = v;
        }
        if let Some(v) = update.min_unique_lines {
            merged.min_unique_lines = v;
        }
        if let Some(v) = update.min_text_length {
            merged.min_text_length = v;
        }
        if let Some(v) = update.required_fields {
            merged.required_fields = v;
        }
        if let Some(v) = update.min_required_field_count {
            merged.min_required_field_count = v;
        }
        if let Some(v) = update.stability_duration_ms {
            merged.stability_duration_ms = v;
        }
        if let Some(v) = update.max_scan_time_ms {
            merged.max_scan_time_ms = v;
        }
        if let Some(v) = update.frame_capture_interval_ms {
            merged.frame_capture_interval_ms = v;
        }
        if let Some(v) = update.debug_logging {
            merged.debug_logging = v;
        }

        merged.validate()?;
        *self = merged;
        tracing::debug!(config = ?self, "Scan config updated");
        Ok(())
    }

    /// Decode a partial JSON object and merge it.
    pub fn update_from_json(&mut self, json: &str) -> Result<(), ConfigError> {
        let update: ScanConfigUpdate = serde_json::from_str(json)?;
        self.update(update)
    }

    /// Restore the compiled defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(out_of_range("minConfidenceThreshold", self.min_confidence));
        }
        if self.max_scan_time_ms == 0 {
            return Err(out_of_range("maxScanTimeMs", self.max_scan_time_ms));
        }
        if self.frame_capture_interval_ms == 0 {
            return Err(out_of_range(
                "frameCaptureIntervalMs",
                self.frame_capture_interval_ms,
            ));
        }
        if self.min_required_field_count > self.required_fields.len() {
            return Err(out_of_range(
                "minRequiredFieldCount",
                self.min_required_field_count,
            ));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value: value.to_string(),
    }
}
