use log::trace;

// Weight of the newest frame in the smoothed frame time.
const SMOOTHING: f64 = 0.1;

/// Measures the wall time between frames and keeps a smoothed fps estimate.
#[derive(Debug)]
pub struct FrameClock {
    frame_start: std::time::Instant,
    // Frames longer than this are reported as this long, if set.
    max_frame_dt: Option<std::time::Duration>,
    smoothed_frame_time: Option<f64>,
    frames: u64,
}

impl FrameClock {
    pub fn new(max_frame_dt: Option<std::time::Duration>) -> FrameClock {
        FrameClock {
            frame_start: std::time::Instant::now(),
            max_frame_dt,
            smoothed_frame_time: None,
            frames: 0,
        }
    }

    /// Time since the previous tick, capped at `max_frame_dt`.
    pub fn tick(&mut self) -> std::time::Duration {
        let now = std::time::Instant::now();
        let elapsed = now - self.frame_start;
        self.frame_start = now;
        self.record(elapsed)
    }

    fn record(&mut self, elapsed: std::time::Duration) -> std::time::Duration {
        self.frames += 1;
        let seconds = elapsed.as_secs_f64();
        self.smoothed_frame_time = Some(match self.smoothed_frame_time {
            Some(smoothed) => smoothed + SMOOTHING * (seconds - smoothed),
            None => seconds,
        });
        match self.max_frame_dt {
            Some(max) if elapsed > max => {
                trace!("Frame took {:?}, stepping {:?}", elapsed, max);
                max
            }
            _ => elapsed,
        }
    }

    pub fn fps(&self) -> Option<f64> {
        match self.smoothed_frame_time {
            Some(t) if t > 0.0 => Some(1.0 / t),
            _ => None,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
