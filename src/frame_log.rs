//! Throttled progress output and frame timing

use std::collections::VecDeque;

/// Emits one line every `interval` frames, starting with the first.
#[derive(Debug, Clone)]
pub struct FrameLogger {
    interval: u64,
    counter: u64,
}

impl FrameLogger {
    /// An interval of 0 never logs.
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            counter: 0,
        }
    }

    /// Advance the frame counter and report whether this frame is due.
    pub fn tick(&mut self) -> bool {
        let due = self.interval != 0 && self.counter % self.interval == 0;
        self.counter += 1;
        due
    }

    /// Log the message built by `message` if this frame is due.
    pub fn log(&mut self, message: impl FnOnce() -> String) {
        let frame = self.counter;
        if self.tick() {
            log::info!("{}: {}", frame, message());
        }
    }
}

/// Moving average over the last `capacity` frame times, in milliseconds.
#[derive(Debug, Clone)]
pub struct FrameTimes {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl FrameTimes {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, millis: f32) {
        self.samples.push_back(millis);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_fires_on_interval() {
        let mut logger = FrameLogger::new(3);
        let due: Vec<bool> = (0..7).map(|_| logger.tick()).collect();
        assert_eq!(due, [true, false, false, true, false, false, true]);
    }

    #[test]
    fn test_zero_interval_never_fires() {
        let mut logger = FrameLogger::new(0);
        assert!((0..10).all(|_| !logger.tick()));
    }

    #[test]
    fn test_message_only_built_when_due() {
        let mut logger = FrameLogger::new(2);
        let mut built = 0;
        for _ in 0..4 {
            logger.log(|| {
                built += 1;
                String::new()
            });
        }
        assert_eq!(built, 2);
    }

    #[test]
    fn test_frame_times_window() {
        let mut times = FrameTimes::new(2);
        assert_eq!(times.average(), 0.0);
        times.push(1.0);
        times.push(3.0);
        assert_eq!(times.average(), 2.0);
        times.push(5.0);
        assert_eq!(times.average(), 4.0);
    }
}
