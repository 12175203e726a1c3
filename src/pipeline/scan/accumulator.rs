//! Multi-frame text accumulation for a single live scan session.
//!
//! A curved or damaged label never shows all of its text in one frame. Each
//! frame's lines are normalized and merged into an insertion-ordered set of
//! unique lines; the joined set is the session's accumulated text. Stability
//! is tracked on that text, and every frame returns a `ScanProgress` with
//! the completion verdict.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::config::ScanConfig;

use super::completion::{evaluate_completion, CompletionInput};
use super::fields::detect_fields;
use super::patterns::MEDICATION_PATTERNS;
use super::types::{RecognizedFrame, ScanProgress, ScanStats};

/// Lines shorter than this after normalization are OCR noise.
const MIN_LINE_CHARS: usize = 3;

/// Word count at which a block's word density saturates.
const DENSITY_WORDS: f32 = 5.0;

/// Score added per distinct medication pattern found in a block.
const PATTERN_WEIGHT: f32 = 0.5;

/// Accumulation state for one scan session.
///
/// Create one per session; call `reset()` to start over. Unique-line count and
/// text length never decrease between resets.
pub struct FrameAccumulator {
    config: ScanConfig,
    /// Unique normalized lines, in first-seen order.
    lines: Vec<String>,
    seen: HashSet<String>,
    /// `lines` joined with newlines.
    all_text: String,
    text_chars: usize,
    confidence_samples: Vec<f32>,
    started_at: Instant,
    /// Snapshot of `all_text` at the last observed change.
    last_snapshot: String,
    last_changed_at: Instant,
    /// Set once a frame arrives without changing the text.
    stable_since: Option<Instant>,
}

impl FrameAccumulator {
    pub fn new(config: ScanConfig) -> Self {
        Self::new_at(config, Instant::now())
    }

    /// Start a session whose clock begins at `now`.
    pub fn new_at(config: ScanConfig, now: Instant) -> Self {
        Self {
            config,
            lines: Vec::new(),
            seen: HashSet::new(),
            all_text: String::new(),
            text_chars: 0,
            confidence_samples: Vec::new(),
            started_at: now,
            last_snapshot: String::new(),
            last_changed_at: now,
            stable_since: None,
        }
    }

    /// Clear all state and restart the session clock.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        let config = std::mem::take(&mut self.config);
        *self = Self::new_at(config, now);
    }

    pub fn process_frame(&mut self, frame: &RecognizedFrame) -> ScanProgress {
        self.process_frame_at(frame, Instant::now())
    }

    /// Merge one recognized frame observed at `now`.
    ///
    /// Never fails: blocks and lines without usable text are skipped.
    pub fn process_frame_at(&mut self, frame: &RecognizedFrame, now: Instant) -> ScanProgress {
        let mut added = 0usize;
        for block in &frame.blocks {
            for raw in block.raw_lines() {
                if let Some(line) = normalize_line(raw) {
                    if self.insert_line(line) {
                        added += 1;
                    }
                }
            }
        }

        if let Some(sample) = frame_confidence(frame) {
            self.confidence_samples.push(sample);
        }

        // Exact comparison: any change to the accumulated text restarts the
        // stable window.
        if self.all_text == self.last_snapshot {
            if self.stable_since.is_none() {
                self.stable_since = Some(self.last_changed_at);
            }
        } else {
            self.last_snapshot.clone_from(&self.all_text);
            self.last_changed_at = now;
            self.stable_since = None;
        }

        let confidence = self.confidence_score();
        let detected_fields = detect_fields(&self.all_text);
        let input = CompletionInput {
            unique_lines: self.lines.len(),
            text_length: self.text_chars,
            confidence,
            stable_window_ms: self
                .stable_since
                .map(|since| millis(now.saturating_duration_since(since))),
            elapsed_session_ms: millis(now.saturating_duration_since(self.started_at)),
        };
        let completion = evaluate_completion(&input, &self.config);

        if self.config.debug_logging {
            tracing::debug!(
                added,
                unique_lines = input.unique_lines,
                text_length = input.text_length,
                confidence,
                stable_window_ms = ?input.stable_window_ms,
                elapsed_ms = input.elapsed_session_ms,
                fields = ?detected_fields,
                completion = ?completion,
                "Frame processed"
            );
        }

        ScanProgress {
            total_text_length: self.text_chars,
            unique_lines: self.lines.len(),
            confidence_score: confidence,
            detected_fields,
            is_complete: completion.is_complete(),
            completion,
        }
    }

    /// The accumulated text: unique lines joined by newlines, first-seen order.
    pub fn accumulated_text(&self) -> &str {
        &self.all_text
    }

    pub fn unique_lines(&self) -> &[String] {
        &self.lines
    }

    /// Mean of all per-frame samples so far, 0 before the first sample.
    ///
    /// Not a probability and not bounded by 1; compare, don't interpret.
    pub fn confidence_score(&self) -> f32 {
        if self.confidence_samples.is_empty() {
            return 0.0;
        }
        self.confidence_samples.iter().sum::<f32>() / self.confidence_samples.len() as f32
    }

    pub fn stats(&self) -> ScanStats {
        self.stats_at(Instant::now())
    }

    pub fn stats_at(&self, now: Instant) -> ScanStats {
        ScanStats {
            unique_lines: self.lines.len(),
            total_chars: self.text_chars,
            elapsed_ms: millis(now.saturating_duration_since(self.started_at)),
            average_confidence: self.confidence_score(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn insert_line(&mut self, line: String) -> bool {
        if !self.seen.insert(line.clone()) {
            return false;
        }
        if !self.all_text.is_empty() {
            self.all_text.push('\n');
            self.text_chars += 1;
        }
        self.text_chars += line.chars().count();
        self.all_text.push_str(&line);
        self.lines.push(line);
        true
    }
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

/// Normalize a raw OCR line: drop `|` and `_` artifacts, collapse whitespace,
/// strip one leading bullet. Returns `None` for lines too short to keep.
pub fn normalize_line(raw: &str) -> Option<String> {
    let stripped: String = raw.chars().filter(|c| !matches!(c, '|' | '_')).collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let line = strip_bullet(&collapsed);
    (line.chars().count() >= MIN_LINE_CHARS).then(|| line.to_string())
}

fn strip_bullet(line: &str) -> &str {
    let mut chars = line.chars();
    match chars.next() {
        Some('•' | '·' | '●' | '▪' | '◦' | '‣') => chars.as_str().trim_start(),
        Some('-' | '*') if chars.as_str().starts_with(' ') => chars.as_str().trim_start(),
        _ => line,
    }
}

/// Per-frame confidence sample.
///
/// Each block with text scores its word density (words longer than two
/// characters, saturating at 1.0) plus 0.5 per distinct medication pattern it
/// contains. The sample is the mean block score, so pattern-dense blocks can
/// push it above 1.0. `None` when no block had text.
fn frame_confidence(frame: &RecognizedFrame) -> Option<f32> {
    let scores: Vec<f32> = frame
        .blocks
        .iter()
        .filter_map(|block| {
            let text = block.full_text();
            if text.trim().is_empty() {
                return None;
            }
            let words = text
                .split_whitespace()
                .filter(|w| w.chars().count() > 2)
                .count();
            let density = (words as f32 / DENSITY_WORDS).min(1.0);
            let hits = MEDICATION_PATTERNS
                .iter()
                .filter(|re| re.is_match(&text))
                .count();
            Some(density + PATTERN_WEIGHT * hits as f32)
        })
        .collect();

    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f32>() / scores.len() as f32)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
