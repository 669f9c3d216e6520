use std::time::{Duration, Instant};

/// Frame timing: when the current frame started and how long the last one took.
#[derive(Debug, Default)]
pub struct Timeline {
    frame_start: Option<Instant>,
    previous_frame_duration: Duration,
    frame_count: u64,
}

impl Timeline {
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn next_frame(&mut self) {
        self.next_frame_at(Instant::now());
    }

    fn start_at(&mut self, now: Instant) {
        self.frame_start = Some(now);
        self.previous_frame_duration = Duration::ZERO;
        self.frame_count = 0;
    }

    /// Does nothing until `start` is called.
    fn next_frame_at(&mut self, now: Instant) {
        let Some(frame_start) = self.frame_start else {
            return;
        };
        self.previous_frame_duration = now.saturating_duration_since(frame_start);
        self.frame_start = Some(now);
        self.frame_count += 1;
    }

    pub fn previous_frame_duration(&self) -> Duration {
        self.previous_frame_duration
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.frame_start.is_some()
    }
}
