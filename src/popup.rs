use std::time::Duration;

use crate::controller::Anchor;

const WORDS_PER_MINUTE: f64 = 200.0;
const SETTLE_MS: f64 = 1000.0;
pub const MIN_READING_TIME: Duration = Duration::from_millis(2000);
pub const MAX_READING_TIME: Duration = Duration::from_millis(30000);

/// How often the browser host advances the dismiss timer.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// How long a notification toast stays up.
pub const NOTIFICATION_TTL: Duration = Duration::from_millis(3000);

/// Rendered width of the translation popup, in CSS pixels.
pub const POPUP_WIDTH: f64 = 320.0;

/// Minimum gap between the popup and the viewport edges.
pub const EDGE_MARGIN: f64 = 20.0;

/// Top-left corner for a popup anchored at `anchor`, pulled back inside the
/// viewport. A viewport too narrow for the popup pins it to the left margin.
pub fn popup_position(anchor: Anchor, viewport_width: f64) -> Anchor {
    let max_x = (viewport_width - POPUP_WIDTH - EDGE_MARGIN).max(EDGE_MARGIN);
    Anchor {
        x: anchor.x.clamp(EDGE_MARGIN, max_x),
        y: anchor.y.max(EDGE_MARGIN),
    }
}

/// Time the selection popup stays up before dismissing itself.
pub fn reading_time(text: &str) -> Duration {
    // "".split(/\s+/) is one token in the extension; keep that
    let words = text.split_whitespace().count().max(1) as f64;
    let ms = words / WORDS_PER_MINUTE * 60.0 * 1000.0 + SETTLE_MS;
    let ms = ms.clamp(
        MIN_READING_TIME.as_millis() as f64,
        MAX_READING_TIME.as_millis() as f64,
    );
    Duration::from_millis(ms.round() as u64)
}

/// Linear countdown that stops accumulating while the pointer is over the popup.
///
/// Times are host timestamps (e.g. `performance.now()`), so the timer itself
/// holds no clock and can be driven deterministically.
#[derive(Debug, Clone)]
pub struct DismissTimer {
    budget: Duration,
    elapsed: Duration,
    running_since: Option<Duration>,
}

impl DismissTimer {
    pub fn start(budget: Duration, now: Duration) -> Self {
        Self {
            budget,
            elapsed: Duration::ZERO,
            running_since: Some(now),
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_paused(&self) -> bool {
        self.running_since.is_none()
    }

    pub fn pause(&mut self, now: Duration) {
        if let Some(since) = self.running_since.take() {
            self.elapsed += now.saturating_sub(since);
        }
    }

    pub fn resume(&mut self, now: Duration) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        match self.running_since {
            Some(since) => self.elapsed + now.saturating_sub(since),
            None => self.elapsed,
        }
    }

    /// Remaining share of the budget in `[0.0, 1.0]`.
    pub fn remaining_fraction(&self, now: Duration) -> f64 {
        if self.budget.is_zero() {
            return 0.0;
        }
        let spent = self.elapsed(now).as_secs_f64() / self.budget.as_secs_f64();
        (1.0 - spent).clamp(0.0, 1.0)
    }

    pub fn expired(&self, now: Duration) -> bool {
        self.elapsed(now) >= self.budget
    }
}
