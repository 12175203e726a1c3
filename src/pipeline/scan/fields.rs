use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::patterns::{
    DATE_RE, DOSAGE_RE, DRUG_SUFFIX_RE, FREQUENCY_RE, PATIENT_NAME_RE, PHONE_RE, QUANTITY_RE,
    REFILLS_RE, RX_NUMBER_RE, STRENGTH_RE,
};
use super::types::DetectedField;

/// Detection table, tested in order.
static FIELD_PATTERNS: LazyLock<Vec<(DetectedField, &'static Regex)>> = LazyLock::new(|| {
    vec![
        (DetectedField::PatientName, &*PATIENT_NAME_RE),
        (DetectedField::DrugName, &*DRUG_SUFFIX_RE),
        (DetectedField::Strength, &*STRENGTH_RE),
        (DetectedField::Dosage, &*DOSAGE_RE),
        (DetectedField::Frequency, &*FREQUENCY_RE),
        (DetectedField::RxNumber, &*RX_NUMBER_RE),
        (DetectedField::Quantity, &*QUANTITY_RE),
        (DetectedField::Refills, &*REFILLS_RE),
        (DetectedField::Date, &*DATE_RE),
        (DetectedField::Phone, &*PHONE_RE),
    ]
});

/// Which medication-relevant fields appear in `text`.
///
/// Pure: used identically by the frame accumulator and the quality assessor.
pub fn detect_fields(text: &str) -> BTreeSet<DetectedField> {
    FIELD_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(field, _)| *field)
        .collect()
}
