use std::sync::LazyLock;

use regex::Regex;

/// `every 8 hours`, `every 6 to 8 hrs`. Group 1 is the shortest interval.
static EVERY_HOURS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bevery\s+(\d+)\s*(?:(?:to|-)\s*\d+\s*)?(?:hours?|hrs?)\b")
        .expect("Invalid schedule pattern")
});

/// `3 times a day`, `2x daily`. Group 1 is the count.
static TIMES_PER_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s*(?:x|times?)\s*(?:a|per|each)?\s*(?:day|daily)\b")
        .expect("Invalid schedule pattern")
});

/// Worded frequencies, checked in order.
static WORDED_FREQUENCIES: LazyLock<Vec<(Regex, u32)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(?:four\s+times|qid)\b", 4),
        (r"(?i)\b(?:three\s+times|thrice|tid)\b", 3),
        (r"(?i)\b(?:two\s+times|twice|bid)\b", 2),
        (r"(?i)\b(?:once|daily|qd|nightly|at\s+bedtime|bedtime)\b", 1),
    ]
    .into_iter()
    .map(|(p, n)| (Regex::new(p).expect("Invalid schedule pattern"), n))
    .collect()
});

/// Rough number of doses per day for a frequency string.
///
/// Used for reminder scheduling. Unrecognized phrasing, including
/// weekly and as-needed schedules, counts as once a day. Never returns 0.
pub fn estimate_doses_per_day(frequency: &str) -> u32 {
    if let Some(hours) = EVERY_HOURS_RE
        .captures(frequency)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|h| *h > 0)
    {
        return ((24.0 / f64::from(hours)).round() as u32).max(1);
    }

    if let Some(count) = TIMES_PER_DAY_RE
        .captures(frequency)
        .and_then(|c| c[1].parse::<u32>().ok())
    {
        return count.clamp(1, 24);
    }

    WORDED_FREQUENCIES
        .iter()
        .find(|(re, _)| re.is_match(frequency))
        .map_or(1, |(_, n)| *n)
}
