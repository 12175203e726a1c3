//! Advisory scan quality assessment.
//!
//! Output only feeds user-facing guidance (rescan, or proceed to manual
//! entry). Nothing here stops the pipeline or reaches off the device.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ScanConfig;

use super::types::{DetectedField, QualityAssessment, QualityIssue};

/// Three or more consecutive `|`/`_`: typical of glare streaks.
static GLARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[|_]{3,}").expect("valid regex"));

/// Five or more consecutive non-word, non-space characters: typical of blur.
static BLUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]{5,}").expect("valid regex"));

pub mod recommendations {
    pub const ACCEPTABLE: &str = "Label captured clearly. Review the details before saving.";
    pub const GLARE: &str =
        "Glare detected. Tilt the bottle or move away from direct light and scan again.";
    pub const TOO_FEW_LINES: &str =
        "Not enough of the label was captured. Slowly rotate the bottle so the whole label passes the camera.";
    pub const LOW_CONFIDENCE: &str =
        "The text is hard to read. Hold the camera steady and make sure the label is in focus.";
    pub const RESCAN: &str =
        "Scan quality is too low. Scan the label again or enter the details manually.";
}

/// Assess a scan for user feedback.
///
/// `confidence` is on the 0.0-1.0 scale. Every applicable issue is recorded;
/// the recommendation picks one message by fixed priority.
pub fn assess_quality(
    text: &str,
    confidence: f32,
    detected_fields: &BTreeSet<DetectedField>,
    unique_line_count: usize,
    config: &ScanConfig,
) -> QualityAssessment {
    let missing_fields: BTreeSet<DetectedField> = config
        .required_fields
        .difference(detected_fields)
        .copied()
        .collect();
    let text_length = text.chars().count();

    let low_confidence = confidence < config.min_confidence;
    let too_few_lines = unique_line_count < config.min_unique_lines;
    let too_short = text_length < config.min_text_length;
    let present_required = config.required_fields.len() - missing_fields.len();

    let is_acceptable = !low_confidence
        && !too_few_lines
        && !too_short
        && present_required >= config.min_required_field_count;

    let mut issues = Vec::new();
    if low_confidence {
        issues.push(QualityIssue::LowConfidence);
    }
    if too_few_lines {
        issues.push(QualityIssue::TooFewLines);
    }
    if too_short {
        issues.push(QualityIssue::TextTooShort);
    }
    issues.extend(missing_fields.iter().filter_map(|f| QualityIssue::for_missing(*f)));
    let glare = GLARE_RE.is_match(text);
    if glare {
        issues.push(QualityIssue::PossibleGlare);
    }
    if BLUR_RE.is_match(text) {
        issues.push(QualityIssue::PossibleBlur);
    }

    let user_recommendation = if is_acceptable {
        recommendations::ACCEPTABLE.to_string()
    } else if glare {
        recommendations::GLARE.to_string()
    } else if too_few_lines {
        recommendations::TOO_FEW_LINES.to_string()
    } else if low_confidence {
        recommendations::LOW_CONFIDENCE.to_string()
    } else if !missing_fields.is_empty() {
        let names: Vec<&str> = missing_fields.iter().map(|f| f.label()).collect();
        format!(
            "Could not find: {}. Scan the label again or enter these details manually.",
            names.join(", ")
        )
    } else {
        recommendations::RESCAN.to_string()
    };

    QualityAssessment {
        confidence,
        is_acceptable,
        issues,
        detected_fields: detected_fields.clone(),
        missing_fields,
        user_recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::scan::fields::detect_fields;

    fn all_required() -> BTreeSet<DetectedField> {
        BTreeSet::from([
            DetectedField::DrugName,
            DetectedField::Strength,
            DetectedField::Dosage,
            DetectedField::Frequency,
        ])
    }

    #[test]
    fn below_thresholds_not_acceptable() {
        let text = "x".repeat(50);
        let assessment = assess_quality(&text, 0.5, &all_required(), 3, &ScanConfig::default());
        assert!(!assessment.is_acceptable);
        assert!(assessment.has_issue(QualityIssue::LowConfidence));
        assert!(assessment.has_issue(QualityIssue::TooFewLines));
        assert!(assessment.has_issue(QualityIssue::TextTooShort));
    }

    #[test]
    fn good_scan_acceptable() {
        let text = "a".repeat(120);
        let assessment = assess_quality(&text, 0.9, &all_required(), 6, &ScanConfig::default());
        assert!(assessment.is_acceptable);
        assert!(assessment.issues.is_empty());
        assert!(assessment.missing_fields.is_empty());
        assert_eq!(assessment.user_recommendation, recommendations::ACCEPTABLE);
    }

    #[test]
    fn two_required_fields_are_enough() {
        let text = "a".repeat(120);
        let fields = BTreeSet::from([DetectedField::DrugName, DetectedField::Strength]);
        let assessment = assess_quality(&text, 0.9, &fields, 6, &ScanConfig::default());
        assert!(assessment.is_acceptable);
        // Missing fields are still reported
        assert!(assessment.has_issue(QualityIssue::MissingDosage));
        assert!(assessment.has_issue(QualityIssue::MissingFrequency));
        assert_eq!(assessment.missing_fields.len(), 2);
    }

    #[test]
    fn one_required_field_not_enough() {
        let text = "a".repeat(120);
        let fields = BTreeSet::from([DetectedField::Strength]);
        let assessment = assess_quality(&text, 0.9, &fields, 6, &ScanConfig::default());
        assert!(!assessment.is_acceptable);
        assert!(assessment.user_recommendation.contains("drug name"));
        assert!(assessment.user_recommendation.contains("dosage"));
        assert!(assessment.user_recommendation.contains("frequency"));
        assert!(!assessment.user_recommendation.contains("strength"));
    }

    #[test]
    fn missing_issue_only_for_known_fields() {
        let config = ScanConfig {
            required_fields: BTreeSet::from([DetectedField::DrugName, DetectedField::RxNumber]),
            min_required_field_count: 1,
            ..ScanConfig::default()
        };
        let assessment = assess_quality("", 0.9, &BTreeSet::new(), 6, &config);
        assert!(assessment.missing_fields.contains(&DetectedField::RxNumber));
        assert!(assessment.has_issue(QualityIssue::MissingDrugName));
        let missing_issues = assessment
            .issues
            .iter()
            .filter(|i| {
                matches!(
                    i,
                    QualityIssue::MissingDrugName
                        | QualityIssue::MissingStrength
                        | QualityIssue::MissingDosage
                        | QualityIssue::MissingFrequency
                )
            })
            .count();
        assert_eq!(missing_issues, 1);
    }

    // ── Image artifacts ─────────────────────────────────

    #[test]
    fn glare_detected_and_prioritized() {
        let text = format!("{}\nAMOX ||| 500MG", "a".repeat(120));
        let assessment = assess_quality(&text, 0.3, &all_required(), 2, &ScanConfig::default());
        assert!(assessment.has_issue(QualityIssue::PossibleGlare));
        assert_eq!(assessment.user_recommendation, recommendations::GLARE);
    }

    #[test]
    fn blur_detected() {
        let text = "TAKE 1 T@#%&*ET DAILY";
        let assessment = assess_quality(text, 0.9, &all_required(), 6, &ScanConfig::default());
        assert!(assessment.has_issue(QualityIssue::PossibleBlur));
    }

    #[test]
    fn punctuation_runs_below_threshold_not_blur() {
        let text = "Rx#: (555) 123-4567";
        let assessment = assess_quality(text, 0.9, &all_required(), 6, &ScanConfig::default());
        assert!(!assessment.has_issue(QualityIssue::PossibleBlur));
        assert!(!assessment.has_issue(QualityIssue::PossibleGlare));
    }

    // ── Recommendation priority ─────────────────────────

    #[test]
    fn too_few_lines_before_low_confidence() {
        let text = "a".repeat(120);
        let assessment = assess_quality(&text, 0.1, &all_required(), 1, &ScanConfig::default());
        assert_eq!(assessment.user_recommendation, recommendations::TOO_FEW_LINES);
    }

    #[test]
    fn low_confidence_before_missing_fields() {
        let text = "a".repeat(120);
        let assessment = assess_quality(&text, 0.1, &BTreeSet::new(), 6, &ScanConfig::default());
        assert_eq!(assessment.user_recommendation, recommendations::LOW_CONFIDENCE);
    }

    #[test]
    fn short_text_falls_back_to_generic_message() {
        let assessment = assess_quality("short", 0.9, &all_required(), 6, &ScanConfig::default());
        assert!(assessment.has_issue(QualityIssue::TextTooShort));
        assert_eq!(assessment.user_recommendation, recommendations::RESCAN);
    }

    #[test]
    fn issues_have_no_duplicates() {
        let text = "||| ***** ||| *****";
        let assessment = assess_quality(text, 0.0, &BTreeSet::new(), 0, &ScanConfig::default());
        let unique: std::collections::HashSet<_> = assessment.issues.iter().collect();
        assert_eq!(unique.len(), assessment.issues.len());
        assert_eq!(assessment.issues.len(), 9);
    }

    #[test]
    fn works_with_detector_output() {
        let text = "Take 1 tablet twice daily, Amoxicillin 500mg, Rx# 1234567";
        let fields = detect_fields(text);
        let assessment = assess_quality(text, 0.9, &fields, 1, &ScanConfig::default());
        assert!(assessment.missing_fields.is_empty());
        assert!(assessment.has_issue(QualityIssue::TooFewLines));
    }
}
