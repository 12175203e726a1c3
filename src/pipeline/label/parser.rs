//! Heuristic prescription label parser.
//!
//! Every extractor is independent and best-effort: a field that cannot be
//! found is left `None`. Nothing here fails.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::pipeline::scan::patterns::{
    DOSAGE_RE, DRUG_SUFFIX_RE, PHONE_RE, QUANTITY_RE, RX_NUMBER_RE, STRENGTH_RE,
};

use super::types::ParsedMedicationData;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid label parser pattern")
}

// ═══════════════════════════════════════════════════════════
// Patterns
// ═══════════════════════════════════════════════════════════

/// Up to four words running to the end of the input. Group 1 is the words.
static TRAILING_WORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b([A-Za-z][A-Za-z-]*(?:[ \t]+[A-Za-z][A-Za-z-]*){0,3})[ \t]*$"));

/// Amount and form followed by a route or schedule, for labels without a
/// direction verb.
static DOSAGE_FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b((?:\d+(?:\.\d+)?|one|two|three|half)\s*(?:tablets?|capsules?|caps?|tabs?|pills?|puffs?|drops?|sprays?|teaspoons?|tsp))\s+(?:by\s+mouth|orally|under\s+the\s+tongue|in\s+each|twice|once|daily|every)\b",
    )
});

/// Frequency phrasings, most specific first. The first match wins.
static FREQUENCY_PHRASES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bevery\s+\d+\s*(?:to|-)\s*\d+\s*(?:hours?|hrs?)\b",
        r"(?i)\bevery\s+\d+\s*(?:hours?|hrs?)\b",
        r"(?i)\b(?:once|twice|thrice|(?:one|two|three|four|\d+)\s+times?)\s+(?:a\s+|per\s+|each\s+)?(?:day|daily|week|weekly)\b",
        r"(?i)\bevery\s+(?:other\s+)?(?:day|morning|evening|night|week)\b",
        r"(?i)\b(?:at\s+bedtime|daily|nightly|weekly)\b",
        r"(?i)\b(?:qd|bid|tid|qid)\b",
        r"(?i)\bas\s+needed\b",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

static ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:by\s+mouth|orally|topically|sublingually|under\s+the\s+tongue|rectally|vaginally|subcutaneously|intramuscularly|in\s+(?:each|the|both|affected)\s+(?:eyes?|ears?|nostrils?)|to\s+(?:the\s+)?(?:affected\s+area|skin))\b",
    )
});

static DURATION_FOR_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\bfor\s+(\d+\s+(?:days?|weeks?|months?))\b"));

static DURATION_UNTIL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\buntil\s+(?:all\s+)?(?:gone|finished|completed)\b"));

static AS_NEEDED_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(?:as\s+needed|prn)\b"));

static DIRECTION_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)^(?:take|inhale|apply|inject|use|instill|chew|dissolve|place|insert|shake)\b")
});

/// Auxiliary warning lines that belong with the directions.
static ADVISORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:with\s+food|with\s+(?:a\s+full\s+glass\s+of\s+)?water|on\s+an\s+empty\s+stomach|do\s+not|may\s+cause|avoid|shake\s+well|refrigerate)\b",
    )
});

static NO_REFILLS_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\bno\s+refills?\b"));

/// `Refills: 2`, `Refills remaining 1`. The trailing class keeps a date
/// (`Refills 12/25/2025`) from being read as a count.
static REFILL_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\brefills?\s*(?:remaining|left)?\s*[:#]?\s*(\d{1,2})(?:[^\d/-]|$)")
});

/// `2 refills`.
static COUNT_REFILLS_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(\d{1,2})\s+refills?\b"));

static REFILL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:refills?|fill)\b[^\n]{0,40}?\b(?:before|by|until|thru|through|exp(?:ires)?)\.?\s*:?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})\b",
    )
});

static PHARMACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\b((?:[A-Za-z0-9&'.-]+[ \t]+){0,3}pharmacy\b(?:[ \t]*#[ \t]*\d+)?)")
});

static PHARMACY_CHAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:CVS|Walgreens|Rite\s+Aid|Walmart|Costco|Kroger|Safeway|Publix|Target|Meijer|Express\s+Scripts|OptumRx)\b",
    )
});

/// Lines likely to carry the pharmacy's contact number.
static PHARMACY_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(?:pharmacy|phone|tel|ph|call)\b"));

static PATIENT_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)^(?:patient|name|pt)\s*[:.]\s*([A-Za-z][A-Za-z'.-]*(?:[ \t]+[A-Za-z][A-Za-z'.-]*){1,3})\s*$",
    )
});

/// Two or three capitalized words filling the whole line.
static NAME_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[A-Z][A-Za-z'.-]+(?:,?[ \t]+[A-Z][A-Za-z'.-]+){1,2}$"));

/// Words that end a drug-name candidate when read right to left.
const DRUG_STOP_WORDS: &[&str] = &[
    "take", "apply", "inhale", "inject", "use", "instill", "chew", "dissolve", "place", "insert",
    "tablet", "tablets", "capsule", "capsules", "daily", "by", "mouth", "twice", "once", "the",
    "of", "each", "every", "and", "drug", "medication", "rx", "qty", "generic", "for", "with",
    "to", "a", "an", "brand", "substituted",
];

/// Words that rule a line out as a patient name.
const NON_NAME_WORDS: &[&str] = &[
    "take", "tablet", "tablets", "capsule", "capsules", "pharmacy", "rx", "qty", "quantity",
    "refill", "refills", "daily", "mouth", "hours", "every", "use", "apply", "warning", "caution",
    "doctor", "dr", "keep", "store", "discard", "generic", "hcl", "by", "the", "of", "with", "and",
    "as", "needed", "before", "after", "food", "for",
];

// ═══════════════════════════════════════════════════════════
// Entry point
// ═══════════════════════════════════════════════════════════

/// Parse accumulated label text into a structured medication record.
///
/// Empty or unrecognizable text yields a record with every field `None` and
/// confidence 0.
pub fn parse_label(raw_text: &str) -> ParsedMedicationData {
    let cleaned: Vec<String> = raw_text
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect();
    if cleaned.is_empty() {
        return ParsedMedicationData::default();
    }
    let lines: Vec<&str> = cleaned.iter().map(String::as_str).collect();
    let text = cleaned.join("\n");

    let frequency = extract_frequency(&text);
    let mut data = ParsedMedicationData {
        patient_name: extract_patient_name(&lines),
        drug_name: extract_drug_name(&lines, &text),
        strength: first_match(&STRENGTH_RE, &text),
        dosage: extract_dosage(&text),
        route: first_match(&ROUTE_RE, &text),
        duration: extract_duration(&text, frequency.as_deref()),
        frequency,
        instructions: extract_instructions(&lines),
        rx_number: first_capture(&RX_NUMBER_RE, &text),
        quantity: first_capture(&QUANTITY_RE, &text),
        refills: extract_refills(&text),
        refills_before_date: extract_refill_date(&text),
        pharmacy: extract_pharmacy(&lines),
        pharmacy_phone: extract_pharmacy_phone(&lines, &text),
        confidence: 0,
    };
    data.confidence = data.compute_confidence();

    tracing::debug!(
        fields = ?data.populated_fields(),
        confidence = data.confidence,
        "Label parsed"
    );
    data
}

// ═══════════════════════════════════════════════════════════
// Extractors
// ═══════════════════════════════════════════════════════════

fn first_match(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().trim().to_string())
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// The words just before a strength on the same line, else the first word
/// with a pharmaceutical suffix anywhere.
fn extract_drug_name(lines: &[&str], text: &str) -> Option<String> {
    for line in lines {
        let Some(strength) = STRENGTH_RE.find(line) else {
            continue;
        };
        let prefix = &line[..strength.start()];
        if let Some(name) = TRAILING_WORDS_RE
            .captures(prefix)
            .and_then(|c| c.get(1))
            .and_then(|m| drug_name_candidate(m.as_str()))
        {
            return Some(name);
        }
    }
    first_match(&DRUG_SUFFIX_RE, text)
}

/// Keep the words after the last stop word.
fn drug_name_candidate(words: &str) -> Option<String> {
    let tokens: Vec<&str> = words.split_whitespace().collect();
    let start = tokens
        .iter()
        .rposition(|t| DRUG_STOP_WORDS.contains(&t.to_lowercase().as_str()))
        .map_or(0, |i| i + 1);
    let kept = &tokens[start..];
    let letters: usize = kept
        .iter()
        .map(|t| t.chars().filter(|c| c.is_ascii_alphabetic()).count())
        .sum();
    (letters >= 3).then(|| kept.join(" "))
}

fn extract_dosage(text: &str) -> Option<String> {
    first_capture(&DOSAGE_RE, text).or_else(|| first_capture(&DOSAGE_FALLBACK_RE, text))
}

fn extract_frequency(text: &str) -> Option<String> {
    FREQUENCY_PHRASES
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().to_string())
}

/// `for 10 days`, `until gone`, or an as-needed qualifier the frequency did
/// not already consume.
fn extract_duration(text: &str, frequency: Option<&str>) -> Option<String> {
    if let Some(days) = first_capture(&DURATION_FOR_RE, text) {
        return Some(days);
    }
    if let Some(until) = first_match(&DURATION_UNTIL_RE, text) {
        return Some(until);
    }
    let as_needed = first_match(&AS_NEEDED_RE, text)?;
    match frequency {
        Some(f) if AS_NEEDED_RE.is_match(f) => None,
        _ => Some(as_needed),
    }
}

/// The direction line plus any advisory lines, joined with `; `.
fn extract_instructions(lines: &[&str]) -> Option<String> {
    let direction = lines.iter().position(|l| DIRECTION_LINE_RE.is_match(l))?;
    let mut parts = vec![lines[direction]];
    parts.extend(
        lines
            .iter()
            .enumerate()
            .filter(|(i, l)| *i != direction && ADVISORY_RE.is_match(l))
            .map(|(_, l)| *l),
    );
    Some(parts.join("; "))
}

fn extract_refills(text: &str) -> Option<String> {
    if NO_REFILLS_RE.is_match(text) {
        return Some("0".to_string());
    }
    first_capture(&REFILL_COUNT_RE, text).or_else(|| first_capture(&COUNT_REFILLS_RE, text))
}

/// Refill deadline as printed, kept only if it is a real calendar date.
fn extract_refill_date(text: &str) -> Option<String> {
    let raw = first_capture(&REFILL_DATE_RE, text)?;
    parse_label_date(&raw).map(|_| raw)
}

/// Parse a US-style `M/D/YY` or `M/D/YYYY` date (dashes also accepted).
pub fn parse_label_date(raw: &str) -> Option<NaiveDate> {
    let year = raw.rsplit(['/', '-']).next()?;
    let format = match year.len() {
        2 => "%m/%d/%y",
        4 => "%m/%d/%Y",
        _ => return None,
    };
    NaiveDate::parse_from_str(&raw.replace('-', "/"), format).ok()
}

fn extract_pharmacy(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find_map(|l| first_capture(&PHARMACY_RE, l))
        .or_else(|| lines.iter().find_map(|l| first_match(&PHARMACY_CHAIN_RE, l)))
}

/// A phone number on a pharmacy or contact line, else the first one found.
fn extract_pharmacy_phone(lines: &[&str], text: &str) -> Option<String> {
    lines
        .iter()
        .filter(|l| PHARMACY_LINE_RE.is_match(l) || PHARMACY_CHAIN_RE.is_match(l))
        .find_map(|l| first_match(&PHONE_RE, l))
        .or_else(|| first_match(&PHONE_RE, text))
}

/// An explicit `Patient:` line, else an early line that reads like a name.
fn extract_patient_name(lines: &[&str]) -> Option<String> {
    if let Some(name) = lines.iter().find_map(|l| first_capture(&PATIENT_PREFIX_RE, l)) {
        return Some(name);
    }
    lines
        .iter()
        .take(3)
        .find(|l| looks_like_name(l))
        .map(|l| l.to_string())
}

fn looks_like_name(line: &str) -> bool {
    NAME_LINE_RE.is_match(line)
        && !DRUG_SUFFIX_RE.is_match(line)
        && !PHARMACY_CHAIN_RE.is_match(line)
        && !line.split_whitespace().any(|w| {
            let word = w.trim_matches(|c: char| !c.is_ascii_alphabetic()).to_lowercase();
            NON_NAME_WORDS.contains(&word.as_str())
        })
}
