//! Compiled label patterns shared by field detection, per-frame confidence
//! and the label parser.

use std::sync::LazyLock;

use regex::Regex;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid label regex pattern")
}

/// Common generic-drug name endings.
pub(crate) const DRUG_SUFFIXES: &str = "cillin|mycin|micin|cycline|oxacin|pril|sartan|olol|dipine|statin|azole|tidine|vir|mab|nib|zepam|azolam|oxetine|traline|afil|formin|gliptin|lukast|phylline|sone|olone|semide|thiazide|triptan|profen|codone|pentin|farin|thyroxine|zine|xaban|parin|dronate";

/// A word ending in a pharmaceutical suffix.
pub(crate) static DRUG_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)\b[a-z]{{2,}}(?:{DRUG_SUFFIXES})\b")));

/// Numeric strength with a unit: `500mg`, `0.5 mcg`, `2.5%`, `100 units`.
pub(crate) static STRENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\b\d+(?:\.\d+)?\s*(?:mcg|mg|ml|g|units?|iu)\b|\b\d+(?:\.\d+)?\s*%")
});

/// Dosage phrasing: a direction verb followed by an amount and a form.
/// Group 1 is the amount and form (`1 tablet`).
pub(crate) static DOSAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:take|inhale|apply|inject|use|instill|chew|dissolve|place)\s+((?:\d+(?:\.\d+)?|one|two|three|four|half|1/2)\s*(?:tablets?|capsules?|caps?|tabs?|pills?|puffs?|drops?|sprays?|patch(?:es)?|teaspoons?|tsp|ml|units?))\b",
    )
});

/// Frequency phrasing, presence only.
pub(crate) static FREQUENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:once|twice|thrice|(?:\d+|two|three|four)\s+times|every|daily|weekly|nightly|as\s+needed|at\s+bedtime)\b",
    )
});

/// Prescription number after an Rx marker. Group 1 is the number.
pub(crate) static RX_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\b(?:rx|prescription)\s*(?:#|no\.?|number)?\s*[:#]?\s*(\d[\d-]{3,}\d)")
});

/// Dispensed quantity. Group 1 is the count.
pub(crate) static QUANTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(?:qty|quantity|disp(?:ensed)?)\s*[:#.]?\s*(\d+)"));

pub(crate) static REFILLS_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\brefills?\b"));

/// Slash- or dash-delimited numeric date. Groups: month, day, year.
pub(crate) static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b"));

pub(crate) static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\(?\b\d{3}\)?[\s.-]?\d{3}[\s.-]\d{4}\b"));

/// Two capitalized tokens on the same line.
pub(crate) static PATIENT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b[A-Z][A-Za-z'-]+[ \t]+[A-Z][A-Za-z'-]+\b"));

/// Patterns that count toward the per-frame confidence sample.
pub(crate) static MEDICATION_PATTERNS: LazyLock<[&'static Regex; 4]> =
    LazyLock::new(|| [&*STRENGTH_RE, &*DOSAGE_RE, &*FREQUENCY_RE, &*DRUG_SUFFIX_RE]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drug_suffixes_match_common_generics() {
        for name in [
            "Amoxicillin",
            "CLINDAMYCIN",
            "doxycycline",
            "Lisinopril",
            "Atorvastatin",
            "Metformin",
            "Hydroxyzine",
            "PREDNISONE",
            "Ibuprofen",
            "Omeprazole",
            "Gabapentin",
        ] {
            assert!(DRUG_SUFFIX_RE.is_match(name), "{name} should match");
        }
    }

    #[test]
    fn drug_suffix_ignores_plain_words() {
        for word in ["tablet", "daily", "pharmacy", "phone", "take", "spine"] {
            assert!(!DRUG_SUFFIX_RE.is_match(word), "{word} should not match");
        }
    }

    #[test]
    fn strength_units() {
        for s in ["500mg", "0.5 mcg", "10 MG", "5ml", "2.5%", "100 units", "400 IU", "1 g"] {
            assert!(STRENGTH_RE.is_match(s), "{s} should match");
        }
        assert!(!STRENGTH_RE.is_match("500 tablets"));
    }

    #[test]
    fn dosage_captures_amount_and_form() {
        let caps = DOSAGE_RE.captures("TAKE 1 TABLET BY MOUTH").unwrap();
        assert_eq!(&caps[1], "1 TABLET");
        let caps = DOSAGE_RE.captures("inhale two puffs").unwrap();
        assert_eq!(&caps[1], "two puffs");
    }

    #[test]
    fn rx_number_forms() {
        for (text, expected) in [
            ("Rx# 1234567", "1234567"),
            ("RX 3570300-03233", "3570300-03233"),
            ("Rx No. 445566", "445566"),
            ("Prescription #: 98765", "98765"),
        ] {
            let caps = RX_NUMBER_RE.captures(text).unwrap();
            assert_eq!(&caps[1], expected, "{text}");
        }
    }

    #[test]
    fn phone_forms() {
        for p in ["(555) 123-4567", "555-123-4567", "555.123.4567"] {
            assert!(PHONE_RE.is_match(p), "{p} should match");
        }
        assert!(!PHONE_RE.is_match("3570300-03233"));
    }

    #[test]
    fn patient_name_stays_on_one_line() {
        assert!(PATIENT_NAME_RE.is_match("John Smith"));
        assert!(PATIENT_NAME_RE.is_match("CADE MONTES"));
        assert!(!PATIENT_NAME_RE.is_match("JOHN\nSMITH"));
    }
}
