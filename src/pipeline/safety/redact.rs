//! PHI redaction for anything leaving the device or reaching a log.
//!
//! Rules run in order, most specific first, and each match is replaced by a
//! bracketed placeholder. Placeholders never match a later rule, which makes
//! `redact` idempotent.

use std::fmt;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::pipeline::scan::patterns::{DRUG_SUFFIX_RE, PHONE_RE};

struct RedactionRule {
    pattern: Regex,
    placeholder: &'static str,
}

fn rule(pattern: &str, placeholder: &'static str) -> RedactionRule {
    RedactionRule {
        pattern: Regex::new(pattern).expect("Invalid redaction pattern"),
        placeholder,
    }
}

static REDACTION_RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    vec![
        // Prescription numbers, before the generic digit rules see them
        rule(
            r"(?i)\b(?:rx|prescription)\s*(?:#|no\.?|number)?\s*[:#]?\s*\d[\d-]{3,}\d",
            "[RX]",
        ),
        // DEA registration: two letters, seven digits
        rule(r"\b[A-Za-z]{2}\d{7}\b", "[DEA]"),
        // NPI: ten digits
        rule(r"\b\d{10}\b", "[NPI]"),
        RedactionRule {
            pattern: PHONE_RE.clone(),
            placeholder: "[PHONE]",
        },
        rule(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b", "[DATE]"),
        rule(
            r"(?i)\b\d+(?:\.\d+)?\s*(?:mcg|mg|ml|g|units?|iu|tablets?|capsules?|caps?|tabs?|puffs?|drops?|sprays?)\b|\b\d+(?:\.\d+)?\s*%",
            "[DOSE]",
        ),
        RedactionRule {
            pattern: DRUG_SUFFIX_RE.clone(),
            placeholder: "[MEDICATION]",
        },
        // Whole token, so no word fragment is left behind to match later
        rule(r"\w*\d{3,}\w*", "[NUMBER]"),
        // Two or more Title-case or ALL-CAPS words in a row
        rule(
            &format!(r"\b{NAME_WORD}(?:[ \t]+{NAME_WORD})+\b"),
            "[NAME]",
        ),
    ]
});

/// `Smith`, `O'Brien`, `Smith-Jones`, `MONTES`.
const NAME_WORD: &str = r"(?:[A-Z](?:[a-z]+|'[A-Z][a-z]+)(?:-[A-Z]?[a-z]+)*|[A-Z]{2,})";

/// Replace identifiers, medication details and names with placeholders.
pub fn redact(text: &str) -> String {
    let mut out = text.to_string();
    for rule in REDACTION_RULES.iter() {
        out = rule
            .pattern
            .replace_all(&out, NoExpand(rule.placeholder))
            .into_owned();
    }
    out
}

/// Display adapter that redacts on format, for use in log fields:
/// `tracing::info!(text = %Redacted(&text), ...)`.
#[derive(Debug, Clone, Copy)]
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0))
    }
}
