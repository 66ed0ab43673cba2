use std::time::Duration;
use tokio::time::Instant;

/// Why a fire did or did not turn into a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Dispatch,
    /// Trimmed document shorter than the minimum.
    TooShort,
    /// Nothing to analyze after segmentation.
    EmptyUnit,
    CoolingDown,
    /// Same unit as the last dispatched one.
    Duplicate,
}

impl Verdict {
    /// Rate-limit rejections, after which an active error must be shown again.
    #[must_use]
    pub const fn is_rate_limited(self) -> bool {
        matches!(self, Self::CoolingDown | Self::Duplicate)
    }
}

/// Cooldown and duplicate filter in front of the backend.
///
/// A dispatch is recorded before the call goes out, so a second fire while the first call is in
/// flight sees it.
#[derive(Debug)]
pub struct DispatchGuard {
    min_chars: usize,
    cooldown: Duration,
    last_sent_at: Option<Instant>,
    last_sent_text: Option<String>,
}

impl DispatchGuard {
    #[must_use]
    pub const fn new(min_chars: usize, cooldown: Duration) -> Self {
        Self {
            min_chars,
            cooldown,
            last_sent_at: None,
            last_sent_text: None,
        }
    }

    /// Check the document length alone.
    #[must_use]
    pub fn admits_length(&self, full_text: &str) -> bool {
        full_text.trim().chars().count() >= self.min_chars
    }

    /// Evaluate one fire against the current state, recording it when accepted.
    pub fn evaluate(&mut self, full_text: &str, unit: &str, now: Instant) -> Verdict {
        if !self.admits_length(full_text) {
            return Verdict::TooShort;
        }
        if unit.is_empty() {
            return Verdict::EmptyUnit;
        }

        let cooling_down = self
            .last_sent_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.cooldown);
        let duplicate = self.last_sent_text.as_deref() == Some(unit);
        log::debug!("guard: cooling_down={cooling_down} duplicate={duplicate}");

        if cooling_down {
            return Verdict::CoolingDown;
        }
        if duplicate {
            return Verdict::Duplicate;
        }

        self.last_sent_at = Some(now);
        self.last_sent_text = Some(unit.to_string());
        Verdict::Dispatch
    }

    #[must_use]
    pub fn last_sent_text(&self) -> Option<&str> {
        self.last_sent_text.as_deref()
    }

    #[must_use]
    pub const fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_millis(8000);

    #[tokio::test(start_paused = true)]
    async fn identical_units_within_cooldown_dispatch_once() {
        let mut guard = DispatchGuard::new(8, COOLDOWN);
        let text = "2 + 2 = 5 is what I wrote.";
        assert_eq!(guard.evaluate(text, "2 + 2 = 5", Instant::now()), Verdict::Dispatch);
        assert_eq!(guard.evaluate(text, "2 + 2 = 5", Instant::now()), Verdict::CoolingDown);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_rejected_even_after_cooldown() {
        let mut guard = DispatchGuard::new(8, COOLDOWN);
        let text = "The sky is green today.";
        guard.evaluate(text, "The sky is green today.", Instant::now());
        tokio::time::advance(COOLDOWN).await;
        assert_eq!(
            guard.evaluate(text, "The sky is green today.", Instant::now()),
            Verdict::Duplicate
        );
        assert_eq!(
            guard.evaluate(text, "The sky is blue today.", Instant::now()),
            Verdict::Dispatch
        );
        assert_eq!(guard.last_sent_text(), Some("The sky is blue today."));
    }

    #[tokio::test(start_paused = true)]
    async fn short_documents_and_empty_units_are_rejected() {
        let mut guard = DispatchGuard::new(8, COOLDOWN);
        assert_eq!(guard.evaluate("  short  ", "short", Instant::now()), Verdict::TooShort);
        assert_eq!(guard.evaluate("long enough text", "", Instant::now()), Verdict::EmptyUnit);
        assert!(guard.last_sent_at().is_none());
        assert!(!Verdict::TooShort.is_rate_limited());
        assert!(Verdict::Duplicate.is_rate_limited());
    }
}
