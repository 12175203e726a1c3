//! Capture guard around a frame accumulator.
//!
//! At most one frame is in flight per session, and a recognition result that
//! arrives after `stop()` never reaches the accumulator.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ScanConfig;
use crate::pipeline::label::{parse_label, ParsedMedicationData};
use crate::pipeline::safety::Redacted;

use super::accumulator::FrameAccumulator;
use super::fields::detect_fields;
use super::quality::assess_quality;
use super::types::{CompletionVerdict, QualityAssessment, RecognizedFrame, ScanProgress, ScanStats};
use super::RecognitionError;

/// Permission to run one capture. Handed back to `complete_capture`.
#[derive(Debug)]
#[must_use = "a capture ticket must be completed or the session stays busy"]
pub struct CaptureTicket {
    session_id: Uuid,
}

/// Final result of a scan session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub final_text: String,
    pub stats: ScanStats,
    pub parsed: ParsedMedicationData,
    pub quality: QualityAssessment,
    /// Verdict of the last processed frame.
    pub completion: CompletionVerdict,
}

pub struct ScanSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    accumulator: FrameAccumulator,
    active: bool,
    capture_in_flight: bool,
    last_progress: Option<ScanProgress>,
}

impl ScanSession {
    pub fn new(config: ScanConfig) -> Self {
        Self::new_at(config, Instant::now())
    }

    pub fn new_at(config: ScanConfig, now: Instant) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session_id = %id, "Scan session started");
        Self {
            id,
            started_at: Utc::now(),
            accumulator: FrameAccumulator::new_at(config, now),
            active: true,
            capture_in_flight: false,
            last_progress: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn capture_in_flight(&self) -> bool {
        self.capture_in_flight
    }

    pub fn accumulator(&self) -> &FrameAccumulator {
        &self.accumulator
    }

    pub fn config(&self) -> &ScanConfig {
        self.accumulator.config()
    }

    pub fn last_progress(&self) -> Option<&ScanProgress> {
        self.last_progress.as_ref()
    }

    /// Claim the capture slot. `None` if the session is stopped or a capture
    /// is already outstanding.
    ///
    /// The slot stays claimed until the ticket is passed to
    /// `complete_capture` or `abandon_capture`. Dropping it leaves the
    /// session busy.
    pub fn begin_capture(&mut self) -> Option<CaptureTicket> {
        if !self.active || self.capture_in_flight {
            return None;
        }
        self.capture_in_flight = true;
        Some(CaptureTicket {
            session_id: self.id,
        })
    }

    pub fn complete_capture(
        &mut self,
        ticket: CaptureTicket,
        result: Result<RecognizedFrame, RecognitionError>,
    ) -> Option<ScanProgress> {
        self.complete_capture_at(ticket, result, Instant::now())
    }

    /// Release the capture slot and feed the frame, observed at `now`, to the
    /// accumulator.
    ///
    /// Returns `None` without touching accumulated state when the session was
    /// stopped meanwhile, recognition failed, or the frame has no text.
    pub fn complete_capture_at(
        &mut self,
        ticket: CaptureTicket,
        result: Result<RecognizedFrame, RecognitionError>,
        now: Instant,
    ) -> Option<ScanProgress> {
        if ticket.session_id != self.id {
            tracing::warn!(
                session_id = %self.id,
                ticket_session = %ticket.session_id,
                "Capture ticket from another session ignored"
            );
            return None;
        }
        self.capture_in_flight = false;

        if !self.active {
            tracing::debug!(session_id = %self.id, "Late recognition result discarded");
            return None;
        }

        let frame = match result {
            Ok(frame) => frame,
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(
                    session_id = %self.id,
                    error = %Redacted(&message),
                    "Frame recognition failed, skipping"
                );
                return None;
            }
        };
        if !frame.has_text() {
            tracing::debug!(session_id = %self.id, "Empty frame skipped");
            return None;
        }

        let progress = self.accumulator.process_frame_at(&frame, now);
        self.last_progress = Some(progress.clone());
        Some(progress)
    }

    /// Release the capture slot without a frame, e.g. when the camera never
    /// delivered one.
    pub fn abandon_capture(&mut self, ticket: CaptureTicket) {
        if ticket.session_id != self.id {
            tracing::warn!(
                session_id = %self.id,
                ticket_session = %ticket.session_id,
                "Capture ticket from another session ignored"
            );
            return;
        }
        self.capture_in_flight = false;
        tracing::debug!(session_id = %self.id, "Capture abandoned");
    }

    /// Deactivate the session. Accumulated state is kept for `outcome()`.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        tracing::info!(
            session_id = %self.id,
            unique_lines = self.accumulator.unique_lines().len(),
            completion = ?self.last_progress.as_ref().map(|p| p.completion),
            "Scan session stopped"
        );
    }

    pub fn outcome(&self) -> ScanOutcome {
        self.outcome_at(Instant::now())
    }

    /// Parse and assess the accumulated text.
    pub fn outcome_at(&self, now: Instant) -> ScanOutcome {
        let text = self.accumulator.accumulated_text();
        let stats = self.accumulator.stats_at(now);
        let detected = detect_fields(text);
        // The running mean can exceed 1.0; the assessor works on 0.0-1.0.
        let confidence = stats.average_confidence.clamp(0.0, 1.0);
        let quality = assess_quality(
            text,
            confidence,
            &detected,
            stats.unique_lines,
            self.accumulator.config(),
        );
        let parsed = parse_label(text);
        let completion = self
            .last_progress
            .as_ref()
            .map_or(CompletionVerdict::Incomplete, |p| p.completion);

        tracing::info!(
            session_id = %self.id,
            completion = ?completion,
            acceptable = quality.is_acceptable,
            issues = ?quality.issues,
            parsed_fields = ?parsed.populated_fields(),
            parsed_confidence = parsed.confidence,
            "Scan finalized"
        );
        if self.config().debug_logging {
            tracing::debug!(session_id = %self.id, text = %Redacted(text), "Final scan text");
        }

        ScanOutcome {
            session_id: self.id,
            started_at: self.started_at,
            final_text: text.to_string(),
            stats,
            parsed,
            quality,
            completion,
        }
    }
}
