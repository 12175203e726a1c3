//! Timer-driven live capture loop.
//!
//! Ticks at `frame_capture_interval_ms`, pulls one recognized frame per tick
//! from an injected `FrameSource`, and forwards each `ScanProgress` to the
//! caller until the session completes or is stopped.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::config::ScanConfig;

use super::session::{ScanOutcome, ScanSession};
use super::types::{RecognizedFrame, ScanProgress};
use super::{RecognitionError, ScanError};

/// External camera capture plus on-device text recognition.
pub trait FrameSource: Send + 'static {
    fn next_frame(
        &mut self,
    ) -> impl Future<Output = Result<RecognizedFrame, RecognitionError>> + Send;
}

/// Handle to a running capture loop.
///
/// Dropping the handle stops the loop at its next tick.
pub struct LiveScanHandle {
    session_id: Uuid,
    active: Arc<AtomicBool>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<ScanOutcome>,
}

impl LiveScanHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop capturing. A recognition call already in flight runs to the end
    /// but its result is discarded.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
            tracing::info!(session_id = %self.session_id, "Live scan stop requested");
        }
    }

    /// Stop if still running and wait for the session outcome.
    pub async fn finish(mut self) -> Result<ScanOutcome, ScanError> {
        self.stop();
        Ok(self.task.await?)
    }
}

/// Start a live scan on the current tokio runtime.
pub fn start_live_scan<S: FrameSource>(
    source: S,
    config: ScanConfig,
    progress_tx: mpsc::Sender<ScanProgress>,
) -> LiveScanHandle {
    let session = ScanSession::new_at(config, Instant::now().into_std());
    let session_id = session.id();
    let active = Arc::new(AtomicBool::new(true));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    tracing::info!(
        session_id = %session_id,
        interval_ms = session.config().frame_capture_interval_ms,
        "Live scan started"
    );
    let task = tokio::spawn(capture_loop(
        source,
        session,
        active.clone(),
        stop_rx,
        progress_tx,
    ));

    LiveScanHandle {
        session_id,
        active,
        stop_tx: Some(stop_tx),
        task,
    }
}

async fn capture_loop<S: FrameSource>(
    mut source: S,
    mut session: ScanSession,
    active: Arc<AtomicBool>,
    mut stop_rx: oneshot::Receiver<()>,
    progress_tx: mpsc::Sender<ScanProgress>,
) -> ScanOutcome {
    let period = Duration::from_millis(session.config().frame_capture_interval_ms.max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // Resolves on stop() and when the handle is dropped.
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {}
        }

        let Some(ticket) = session.begin_capture() else {
            break;
        };
        let result = source.next_frame().await;
        if !active.load(Ordering::Acquire) {
            session.stop();
        }

        let Some(progress) =
            session.complete_capture_at(ticket, result, Instant::now().into_std())
        else {
            if session.is_active() {
                continue;
            }
            break;
        };

        let done = progress.is_complete;
        // A full channel must not keep stop() from landing.
        tokio::select! {
            _ = &mut stop_rx => break,
            sent = progress_tx.send(progress) => {
                if sent.is_err() {
                    tracing::debug!(
                        session_id = %session.id(),
                        "Progress receiver dropped, stopping"
                    );
                    break;
                }
            }
        }
        if done {
            break;
        }
    }

    session.stop();
    active.store(false, Ordering::Release);
    let outcome = session.outcome_at(Instant::now().into_std());
    tracing::info!(
        session_id = %outcome.session_id,
        completion = ?outcome.completion,
        unique_lines = outcome.stats.unique_lines,
        elapsed_ms = outcome.stats.elapsed_ms,
        "Live scan ended"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::pipeline::scan::types::{CompletionVerdict, TextBlock};

    const LABEL_LINES: [&str; 6] = [
        "HYDROXYZINE HCL 10MG TABLETS",
        "TAKE 1 TABLET BY MOUTH EVERY 6 TO 8 HOURS",
        "AS NEEDED FOR ITCHING",
        "RX# 3570300-03233",
        "QTY: 30 REFILLS: 1",
        "CVS PHARMACY (555) 123-4567",
    ];

    fn label_frame() -> RecognizedFrame {
        RecognizedFrame::from_blocks(vec![TextBlock::new(&LABEL_LINES)])
    }

    /// Replays scripted results, then repeats the label frame.
    struct ScriptedSource {
        script: VecDeque<Result<RecognizedFrame, RecognitionError>>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<RecognizedFrame, RecognitionError>>) -> Self {
            Self {
                script: script.into(),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        async fn next_frame(&mut self) -> Result<RecognizedFrame, RecognitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.script.pop_front().unwrap_or_else(|| Ok(label_frame()))
        }
    }

    /// Adds a new line every frame, so the text never stabilizes.
    struct ChangingSource {
        pass: usize,
    }

    impl FrameSource for ChangingSource {
        async fn next_frame(&mut self) -> Result<RecognizedFrame, RecognitionError> {
            self.pass += 1;
            let extra = format!("SCAN PASS {}", self.pass);
            let mut lines: Vec<&str> = LABEL_LINES.to_vec();
            lines.push(&extra);
            Ok(RecognizedFrame::from_blocks(vec![TextBlock::new(&lines)]))
        }
    }

    async fn drain(mut rx: mpsc::Receiver<ScanProgress>) -> Vec<ScanProgress> {
        let mut updates = Vec::new();
        while let Some(progress) = rx.recv().await {
            updates.push(progress);
        }
        updates
    }

    #[tokio::test(start_paused = true)]
    async fn completes_once_text_is_stable() {
        let (tx, rx) = mpsc::channel(16);
        let handle = start_live_scan(ScriptedSource::new(Vec::new()), ScanConfig::default(), tx);
        assert!(handle.is_active());

        let updates = drain(rx).await;
        assert_eq!(updates.len(), 4);
        assert!(updates[..3].iter().all(|p| !p.is_complete));
        assert_eq!(updates[3].completion, CompletionVerdict::Stable);

        let outcome = handle.finish().await.unwrap();
        assert_eq!(outcome.completion, CompletionVerdict::Stable);
        assert_eq!(outcome.stats.unique_lines, 6);
        assert_eq!(outcome.parsed.drug_name.as_deref(), Some("HYDROXYZINE HCL"));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_text_keeps_changing() {
        let config = ScanConfig {
            max_scan_time_ms: 3_000,
            ..ScanConfig::default()
        };
        let (tx, rx) = mpsc::channel(16);
        let handle = start_live_scan(ChangingSource { pass: 0 }, config, tx);

        let updates = drain(rx).await;
        let last = updates.last().unwrap();
        assert_eq!(last.completion, CompletionVerdict::TimedOut);

        let outcome = handle.finish().await.unwrap();
        assert_eq!(outcome.completion, CompletionVerdict::TimedOut);
        assert!(outcome.stats.elapsed_ms >= 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn recognition_failures_are_skipped() {
        let source = ScriptedSource::new(vec![
            Err(RecognitionError::Failed("engine busy".into())),
            Ok(RecognizedFrame::default()),
        ]);
        let calls = source.calls.clone();
        let (tx, rx) = mpsc::channel(16);
        let handle = start_live_scan(source, ScanConfig::default(), tx);

        let updates = drain(rx).await;
        assert_eq!(updates.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        let outcome = handle.finish().await.unwrap();
        assert_eq!(outcome.completion, CompletionVerdict::Stable);
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_after_stop_is_discarded() {
        let mut source = ScriptedSource::new(Vec::new());
        source.delay = Duration::from_millis(300);
        let calls = source.calls.clone();
        let (tx, mut rx) = mpsc::channel(16);
        let mut handle = start_live_scan(source, ScanConfig::default(), tx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop();
        assert!(!handle.is_active());

        let outcome = handle.finish().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.stats.unique_lines, 0);
        assert!(outcome.final_text.is_empty());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_loop() {
        let source = ScriptedSource::new(Vec::new());
        let calls = source.calls.clone();
        let (tx, rx) = mpsc::channel(16);
        let handle = start_live_scan(source, ScanConfig::default(), tx);
        drop(handle);

        let updates = drain(rx).await;
        assert!(updates.len() <= 1);
        assert!(calls.load(Ordering::SeqCst) <= 1);
    }

    // ── Progress back-pressure ──────────────────────────

    #[tokio::test(start_paused = true)]
    async fn stop_lands_while_progress_channel_is_full() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = start_live_scan(ChangingSource { pass: 0 }, ScanConfig::default(), tx);

        tokio::time::sleep(Duration::from_secs(3)).await;
        let outcome = tokio::time::timeout(Duration::from_secs(120), handle.finish())
            .await
            .expect("finish() should resolve with an undrained channel")
            .unwrap();
        assert!(outcome.stats.unique_lines >= 7);
        assert_ne!(outcome.completion, CompletionVerdict::Stable);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_receiver_ends_scan() {
        let source = ScriptedSource::new(Vec::new());
        let calls = source.calls.clone();
        let (tx, rx) = mpsc::channel(16);
        drop(rx);
        let handle = start_live_scan(source, ScanConfig::default(), tx);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!handle.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let outcome = handle.finish().await.unwrap();
        assert_eq!(outcome.stats.unique_lines, 6);
    }
}
