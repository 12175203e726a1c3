use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ScanError;

// ═══════════════════════════════════════════════════════════
// Recognition input
// ═══════════════════════════════════════════════════════════

/// One recognized line of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    #[serde(default)]
    pub text: String,
}

/// A recognized block: its full text plus the lines it was split into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

/// Output of the on-device recognizer for a single camera frame.
///
/// Extra keys the engine may attach (corner points, frames, languages) are
/// ignored; the fields used here must have the right types or decoding fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedFrame {
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
}

impl TextBlock {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            text: lines.join("\n"),
            lines: lines
                .iter()
                .map(|l| TextLine {
                    text: l.to_string(),
                })
                .collect(),
        }
    }

    /// Raw line strings. Falls back to splitting `text` when the engine
    /// reported no line breakdown.
    pub fn raw_lines(&self) -> Vec<&str> {
        if self.lines.is_empty() {
            self.text.lines().collect()
        } else {
            self.lines.iter().map(|l| l.text.as_str()).collect()
        }
    }

    /// Full block text, rebuilt from the lines when `text` is blank.
    pub fn full_text(&self) -> String {
        if self.text.trim().is_empty() {
            self.lines
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            self.text.clone()
        }
    }
}

impl RecognizedFrame {
    pub fn from_blocks(blocks: Vec<TextBlock>) -> Self {
        Self { blocks }
    }

    /// Decode a recognizer payload.
    pub fn from_json(json: &str) -> Result<Self, ScanError> {
        serde_json::from_str(json).map_err(ScanError::InvalidFrame)
    }

    /// Whether any block carries non-whitespace text.
    pub fn has_text(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| !b.full_text().trim().is_empty())
    }
}

// ═══════════════════════════════════════════════════════════
// Field keys
// ═══════════════════════════════════════════════════════════

/// Medication-relevant fields whose presence can be detected in label text.
/// Declaration order is the detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectedField {
    PatientName,
    DrugName,
    Strength,
    Dosage,
    Frequency,
    RxNumber,
    Quantity,
    Refills,
    Date,
    Phone,
}

impl DetectedField {
    pub const ALL: [DetectedField; 10] = [
        Self::PatientName,
        Self::DrugName,
        Self::Strength,
        Self::Dosage,
        Self::Frequency,
        Self::RxNumber,
        Self::Quantity,
        Self::Refills,
        Self::Date,
        Self::Phone,
    ];

    /// Field key as used on the host side.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatientName => "patientName",
            Self::DrugName => "drugName",
            Self::Strength => "strength",
            Self::Dosage => "dosage",
            Self::Frequency => "frequency",
            Self::RxNumber => "rxNumber",
            Self::Quantity => "quantity",
            Self::Refills => "refills",
            Self::Date => "date",
            Self::Phone => "phone",
        }
    }

    /// Human-readable name for user guidance.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PatientName => "patient name",
            Self::DrugName => "drug name",
            Self::Strength => "strength",
            Self::Dosage => "dosage",
            Self::Frequency => "frequency",
            Self::RxNumber => "Rx number",
            Self::Quantity => "quantity",
            Self::Refills => "refills",
            Self::Date => "date",
            Self::Phone => "phone number",
        }
    }
}

impl fmt::Display for DetectedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════
// Progress
// ═══════════════════════════════════════════════════════════

/// Why (or whether) a session is considered complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionVerdict {
    Incomplete,
    /// Minimum data present, text stable long enough, confidence met.
    Stable,
    /// Minimum data present and the session deadline passed.
    TimedOut,
}

impl CompletionVerdict {
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Incomplete)
    }
}

/// Snapshot returned after each processed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub total_text_length: usize,
    pub unique_lines: usize,
    /// Running mean of per-frame samples. Heuristic, for relative comparison.
    pub confidence_score: f32,
    pub detected_fields: BTreeSet<DetectedField>,
    pub is_complete: bool,
    pub completion: CompletionVerdict,
}

/// Read-only accumulator statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub unique_lines: usize,
    pub total_chars: usize,
    pub elapsed_ms: u64,
    pub average_confidence: f32,
}

// ═══════════════════════════════════════════════════════════
// Quality
// ═══════════════════════════════════════════════════════════

/// Problems found by the quality assessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    LowConfidence,
    TooFewLines,
    TextTooShort,
    MissingDrugName,
    MissingStrength,
    MissingDosage,
    MissingFrequency,
    PossibleGlare,
    PossibleBlur,
}

impl QualityIssue {
    /// Issue raised when a required field is missing, for the fields that
    /// have one.
    pub fn for_missing(field: DetectedField) -> Option<Self> {
        match field {
            DetectedField::DrugName => Some(Self::MissingDrugName),
            DetectedField::Strength => Some(Self::MissingStrength),
            DetectedField::Dosage => Some(Self::MissingDosage),
            DetectedField::Frequency => Some(Self::MissingFrequency),
            _ => None,
        }
    }
}

/// Advisory assessment shown to the user. Never drives the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityAssessment {
    pub confidence: f32,
    pub is_acceptable: bool,
    /// Every applicable issue, duplicate-free, in detection order.
    pub issues: Vec<QualityIssue>,
    pub detected_fields: BTreeSet<DetectedField>,
    pub missing_fields: BTreeSet<DetectedField>,
    pub user_recommendation: String,
}

impl QualityAssessment {
    pub fn has_issue(&self, issue: QualityIssue) -> bool {
        self.issues.contains(&issue)
    }
}
