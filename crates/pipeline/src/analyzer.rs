use crate::client::TutorApi;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::guard::{DispatchGuard, Verdict};
use crate::notice::{LastResult, Notice};
use crate::source::{DocumentSource, Key, KeystrokeBuffer};
use crate::subject::detect_subject;
use crate::trigger::TriggerScheduler;
use rethink_protocol::{AnalyzeResponse, Subject};
use rethink_segmenter::{Segmenter, SegmenterConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Something happened in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditEvent {
    /// Key press; also fed to the keystroke buffer when one is attached.
    Key(Key),
    /// The document changed without a key press (paste, remote edit).
    Changed,
}

/// One accepted fire, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeCall {
    pub subject: Subject,
    pub full_text: String,
    pub new_content: String,
}

/// Outcome of preparing a fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    Disabled,
    /// The document source failed and nothing was cached.
    SourceFailed,
    Skipped(Verdict),
    Dispatch(AnalyzeCall),
}

/// Client pipeline: source → segmenter → guard → backend → notices.
///
/// All state is owned by one task. Backend calls made by [`run`](Self::run) are spawned so edits
/// keep re-arming the trigger while a call is in flight; results are applied in arrival order.
pub struct Analyzer<S, A> {
    source: S,
    api: Arc<A>,
    segmenter: Segmenter,
    guard: DispatchGuard,
    trigger: TriggerScheduler,
    config: PipelineConfig,
    subject: Option<Subject>,
    enabled: Arc<AtomicBool>,
    keystrokes: Option<Arc<KeystrokeBuffer>>,
    previous_window: Option<String>,
    active_error: Option<String>,
    last_result: Option<LastResult>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl<S, A> Analyzer<S, A>
where
    S: DocumentSource,
    A: TutorApi + 'static,
{
    pub fn new(
        source: S,
        api: Arc<A>,
        config: PipelineConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Notice>)> {
        config.validate().map_err(crate::error::PipelineError::InvalidConfig)?;
        let segmenter = Segmenter::new(SegmenterConfig {
            window_chars: config.window_chars,
            ..SegmenterConfig::default()
        })?;
        let (tx, rx) = mpsc::unbounded_channel();
        let analyzer = Self {
            source,
            api,
            segmenter,
            guard: DispatchGuard::new(config.min_chars, config.cooldown),
            trigger: TriggerScheduler::new(config.pause),
            config,
            subject: None,
            enabled: Arc::new(AtomicBool::new(true)),
            keystrokes: None,
            previous_window: None,
            active_error: None,
            last_result: None,
            notices: tx,
        };
        Ok((analyzer, rx))
    }

    /// Use a fixed subject instead of detecting one per unit.
    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Feed key events into `buffer` as they arrive.
    #[must_use]
    pub fn with_keystrokes(mut self, buffer: Arc<KeystrokeBuffer>) -> Self {
        self.keystrokes = Some(buffer);
        self
    }

    /// Shared on/off switch, checked before every cycle.
    #[must_use]
    pub fn enabled_handle(&self) -> Arc<AtomicBool> {
        self.enabled.clone()
    }

    /// Location of the error the backend last reported as active.
    #[must_use]
    pub fn active_error(&self) -> Option<&str> {
        self.active_error.as_deref()
    }

    #[must_use]
    pub const fn last_result(&self) -> Option<&LastResult> {
        self.last_result.as_ref()
    }

    #[must_use]
    pub const fn trigger(&self) -> &TriggerScheduler {
        &self.trigger
    }

    /// React to an edit: update the keystroke buffer, show a notice and re-arm the trigger.
    pub fn on_edit(&mut self, event: EditEvent) {
        if let EditEvent::Key(key) = event {
            if let Some(buffer) = &self.keystrokes {
                buffer.apply(key);
            }
            self.notify(if self.active_error.is_some() {
                Notice::IssueStillPresent
            } else {
                Notice::Hidden
            });
        }
        self.trigger.arm();
    }

    /// Read the document and decide whether this fire goes to the backend.
    ///
    /// An accepted fire is recorded by the guard before this returns.
    pub async fn prepare(&mut self) -> Prepared {
        if !self.enabled.load(Ordering::SeqCst) {
            return Prepared::Disabled;
        }

        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::debug!("document source failed: {err}");
                self.notify(Notice::Failed {
                    message: err.to_string(),
                });
                return Prepared::SourceFailed;
            }
        };
        log::debug!(
            "analyze: source={} len={}",
            snapshot.provenance,
            snapshot.trimmed_len()
        );

        if !self.guard.admits_length(&snapshot.text) {
            self.notify(Notice::KeepWriting);
            return Prepared::Skipped(Verdict::TooShort);
        }

        let window = self.segmenter.window(&snapshot.text).to_string();
        let unit = self
            .segmenter
            .segment(&window, self.previous_window.as_deref());
        log::debug!("analyze: unit={:?} origin={:?}", unit.text, unit.origin);

        let verdict = self.guard.evaluate(&window, &unit.text, Instant::now());
        if verdict != Verdict::Dispatch {
            if verdict.is_rate_limited() {
                if let Some(location) = self.active_error.clone() {
                    self.notify(Notice::IssueFound { location });
                }
            }
            return Prepared::Skipped(verdict);
        }

        self.previous_window = Some(window.clone());
        self.notify(Notice::Analyzing);
        Prepared::Dispatch(AnalyzeCall {
            subject: self.subject.unwrap_or_else(|| detect_subject(&unit.text)),
            full_text: window,
            new_content: unit.text,
        })
    }

    /// Reconcile local state with a completed backend call.
    pub fn apply(&mut self, result: Result<AnalyzeResponse>) {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                log::warn!("analyze failed: {err}");
                self.notify(Notice::Failed {
                    message: err.to_string(),
                });
                return;
            }
        };

        let location = response.has_error.then(|| {
            response
                .location
                .clone()
                .unwrap_or_else(|| self.config.fallback_location.clone())
        });
        self.last_result = Some(LastResult {
            has_error: response.has_error,
            location: location.clone(),
        });

        self.active_error = match (response.has_active_error, location) {
            (false, _) => None,
            (true, Some(location)) => Some(location),
            (true, None) => Some(
                self.active_error
                    .take()
                    .unwrap_or_else(|| self.config.fallback_location.clone()),
            ),
        };

        match &self.active_error {
            Some(location) if response.has_error => self.notify(Notice::IssueFound {
                location: location.clone(),
            }),
            _ => self.notify(Notice::LookingGood),
        }
    }

    /// Run one full cycle now, waiting for the backend.
    pub async fn analyze_now(&mut self) -> Prepared {
        let prepared = self.prepare().await;
        if let Prepared::Dispatch(call) = &prepared {
            let result = self
                .api
                .analyze(call.subject, &call.full_text, &call.new_content)
                .await;
            self.apply(result);
        }
        prepared
    }

    /// Drive the pipeline from an edit stream until it closes.
    ///
    /// Calls still in flight when the stream closes are awaited and applied before returning.
    pub async fn run(mut self, mut edits: mpsc::Receiver<EditEvent>) -> Self {
        let mut in_flight: JoinSet<Result<AnalyzeResponse>> = JoinSet::new();
        let mut open = true;

        while open || !in_flight.is_empty() {
            tokio::select! {
                event = edits.recv(), if open => match event {
                    Some(event) => self.on_edit(event),
                    None => {
                        open = false;
                        self.trigger.cancel();
                    }
                },
                () = self.trigger.fired() => {
                    if let Prepared::Dispatch(call) = self.prepare().await {
                        let api = self.api.clone();
                        in_flight.spawn(async move {
                            api.analyze(call.subject, &call.full_text, &call.new_content).await
                        });
                    }
                }
                Some(joined) = in_flight.join_next() => match joined {
                    Ok(result) => self.apply(result),
                    Err(err) => log::error!("analyze task failed: {err}"),
                },
            }
        }
        self
    }

    fn notify(&self, notice: Notice) {
        // A dropped receiver only means nobody is rendering.
        let _ = self.notices.send(notice);
    }
}
