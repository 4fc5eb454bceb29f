//! Frame time monitoring

use std::collections::VecDeque;

pub const SAMPLE_WINDOW: usize = 60;
/// 60 FPS
pub const GOOD_FRAME_MS: f64 = 1000.0 / 60.0;
/// 30 FPS
pub const OK_FRAME_MS: f64 = 1000.0 / 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfStatus {
    Good,
    Ok,
    Poor,
}

/// Rolling average over the last [`SAMPLE_WINDOW`] frames
#[derive(Debug, Clone, Default)]
pub struct PerformanceMonitor {
    samples: VecDeque<f64>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(SAMPLE_WINDOW),
        }
    }

    pub fn record(&mut self, frame_ms: f64) {
        if self.samples.len() == SAMPLE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(frame_ms);
    }

    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn fps(&self) -> u32 {
        let avg = self.average_ms();
        if avg <= 0.0 { 0 } else { (1000.0 / avg).round() as u32 }
    }

    /// `None` until the window has filled
    pub fn status(&self) -> Option<PerfStatus> {
        if self.samples.len() < SAMPLE_WINDOW {
            return None;
        }
        let avg = self.average_ms();
        Some(if avg <= GOOD_FRAME_MS {
            PerfStatus::Good
        } else if avg <= OK_FRAME_MS {
            PerfStatus::Ok
        } else {
            PerfStatus::Poor
        })
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}
