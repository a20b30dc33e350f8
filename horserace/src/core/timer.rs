/// BreakTimer is a cancellable one-shot timer. It does not run callbacks itself: the owner polls
/// it once per frame and reacts when it reports that the deadline passed.
#[derive(Debug, Default)]
pub struct BreakTimer {
    deadline_ms: Option<f64>,
}

impl BreakTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// schedule arms the timer, replacing any pending deadline.
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64) {
        self.deadline_ms = Some(now_ms + delay_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// poll returns true exactly once when the deadline has been reached and disarms the timer.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}
