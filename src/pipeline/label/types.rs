use serde::{Deserialize, Serialize};

/// Points per required field present (drug name, strength, dosage, frequency).
pub const REQUIRED_FIELD_POINTS: u32 = 20;

/// Points per optional field present.
pub const OPTIONAL_FIELD_POINTS: u32 = 2;

/// Structured medication record parsed from label text.
///
/// Always fully constructed: a field the label did not yield is `None`.
/// `confidence` is on a 0-100 scale, unlike the 0.0-1.0 scan confidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMedicationData {
    pub patient_name: Option<String>,
    pub drug_name: Option<String>,
    pub strength: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub rx_number: Option<String>,
    pub quantity: Option<String>,
    pub refills: Option<String>,
    pub refills_before_date: Option<String>,
    pub pharmacy: Option<String>,
    pub pharmacy_phone: Option<String>,
    pub confidence: u8,
}

impl ParsedMedicationData {
    fn required(&self) -> [(&'static str, &Option<String>); 4] {
        [
            ("drugName", &self.drug_name),
            ("strength", &self.strength),
            ("dosage", &self.dosage),
            ("frequency", &self.frequency),
        ]
    }

    fn optional(&self) -> [(&'static str, &Option<String>); 10] {
        [
            ("patientName", &self.patient_name),
            ("route", &self.route),
            ("duration", &self.duration),
            ("instructions", &self.instructions),
            ("rxNumber", &self.rx_number),
            ("quantity", &self.quantity),
            ("refills", &self.refills),
            ("refillsBeforeDate", &self.refills_before_date),
            ("pharmacy", &self.pharmacy),
            ("pharmacyPhone", &self.pharmacy_phone),
        ]
    }

    /// Keys of the populated fields. Safe to log; values are not.
    pub fn populated_fields(&self) -> Vec<&'static str> {
        self.required()
            .into_iter()
            .chain(self.optional())
            .filter(|(_, v)| v.is_some())
            .map(|(k, _)| k)
            .collect()
    }

    pub fn required_field_count(&self) -> usize {
        self.required().iter().filter(|(_, v)| v.is_some()).count()
    }

    pub fn optional_field_count(&self) -> usize {
        self.optional().iter().filter(|(_, v)| v.is_some()).count()
    }

    /// Confidence from field coverage: required fields dominate, so one more
    /// required field always outweighs every optional field combined.
    pub fn compute_confidence(&self) -> u8 {
        let score = self.required_field_count() as u32 * REQUIRED_FIELD_POINTS
            + self.optional_field_count() as u32 * OPTIONAL_FIELD_POINTS;
        score.min(100) as u8
    }

    /// Confidence on the 0.0-1.0 scale used by the scan pipeline.
    pub fn confidence_ratio(&self) -> f32 {
        f32::from(self.confidence) / 100.0
    }

    /// Whether the user should confirm or complete the record by hand.
    pub fn needs_manual_review(&self, threshold: f32) -> bool {
        self.confidence_ratio() < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_required(n: usize) -> ParsedMedicationData {
        let mut data = ParsedMedicationData::default();
        let values = [
            &mut data.drug_name,
            &mut data.strength,
            &mut data.dosage,
            &mut data.frequency,
        ];
        for slot in values.into_iter().take(n) {
            *slot = Some("x".into());
        }
        data
    }

    #[test]
    fn empty_record_scores_zero() {
        let data = ParsedMedicationData::default();
        assert_eq!(data.compute_confidence(), 0);
        assert!(data.populated_fields().is_empty());
    }

    #[test]
    fn confidence_monotonic_in_required_fields() {
        let mut last = 0;
        for n in 0..=4 {
            let c = with_required(n).compute_confidence();
            assert!(c >= last);
            last = c;
        }
        assert_eq!(last, 80);
    }

    #[test]
    fn required_field_outweighs_all_optional() {
        let mut rich_optional = with_required(1);
        rich_optional.patient_name = Some("x".into());
        rich_optional.route = Some("x".into());
        rich_optional.duration = Some("x".into());
        rich_optional.instructions = Some("x".into());
        rich_optional.rx_number = Some("x".into());
        rich_optional.quantity = Some("x".into());
        rich_optional.refills = Some("x".into());
        rich_optional.refills_before_date = Some("x".into());
        rich_optional.pharmacy = Some("x".into());
        rich_optional.pharmacy_phone = Some("x".into());
        assert!(with_required(2).compute_confidence() >= rich_optional.compute_confidence());
    }

    #[test]
    fn full_record_caps_at_hundred() {
        let mut data = with_required(4);
        data.patient_name = Some("x".into());
        data.route = Some("x".into());
        data.duration = Some("x".into());
        data.instructions = Some("x".into());
        data.rx_number = Some("x".into());
        data.quantity = Some("x".into());
        data.refills = Some("x".into());
        data.refills_before_date = Some("x".into());
        data.pharmacy = Some("x".into());
        data.pharmacy_phone = Some("x".into());
        assert_eq!(data.compute_confidence(), 100);
        assert_eq!(data.populated_fields().len(), 14);
    }

    #[test]
    fn manual_review_converts_scale() {
        let mut data = with_required(3);
        data.confidence = data.compute_confidence();
        assert!((data.confidence_ratio() - 0.6).abs() < f32::EPSILON);
        assert!(data.needs_manual_review(0.7));
        assert!(!data.needs_manual_review(0.5));
    }

    #[test]
    fn serializes_camel_case() {
        let mut data = with_required(1);
        data.refills_before_date = Some("12/25/2025".into());
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"drugName\":\"x\""));
        assert!(json.contains("\"refillsBeforeDate\":\"12/25/2025\""));
        assert!(json.contains("\"pharmacyPhone\":null"));
    }
}
