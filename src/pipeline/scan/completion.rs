use crate::config::ScanConfig;

use super::types::CompletionVerdict;

/// Accumulator measurements the completion decision is made from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionInput {
    pub unique_lines: usize,
    pub text_length: usize,
    pub confidence: f32,
    /// Time the accumulated text has been unchanged. `None` until a stable
    /// window has started.
    pub stable_window_ms: Option<u64>,
    pub elapsed_session_ms: u64,
}

/// Decide whether enough stable, good-quality text has been gathered.
///
/// A session completes when it has minimum data and is either stable with
/// enough confidence, or past `max_scan_time_ms`. The timeout needs neither
/// stability nor confidence; without minimum data nothing ever completes and
/// the caller has to finish manually.
pub fn evaluate_completion(input: &CompletionInput, config: &ScanConfig) -> CompletionVerdict {
    let has_minimum_data = input.unique_lines >= config.min_unique_lines
        && input.text_length >= config.min_text_length;
    if !has_minimum_data {
        return CompletionVerdict::Incomplete;
    }

    let is_stable = input
        .stable_window_ms
        .is_some_and(|ms| ms >= config.stability_duration_ms);
    let meets_confidence = input.confidence >= config.min_confidence;
    if is_stable && meets_confidence {
        return CompletionVerdict::Stable;
    }

    if input.elapsed_session_ms >= config.max_scan_time_ms {
        return CompletionVerdict::TimedOut;
    }

    CompletionVerdict::Incomplete
}

pub fn is_complete(input: &CompletionInput, config: &ScanConfig) -> bool {
    evaluate_completion(input, config).is_complete()
}
