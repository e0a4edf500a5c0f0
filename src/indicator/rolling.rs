use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Lookback used for causal window statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    /// Every observation from the series start up to the current point.
    Expanding,
    /// The last `n` positions (missing positions still occupy a slot).
    Rolling(usize),
}

/// Statistics over the defined values currently inside the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (divide by N).
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Causal rolling/expanding window. A point only ever sees data up to and
/// including itself.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    window: Window,
    min_periods: usize,
    buffer: VecDeque<Option<f64>>,
}

impl RollingWindow {
    pub fn new(window: Window, min_periods: usize) -> Self {
        assert!(min_periods > 0, "window min_periods must be > 0");
        if let Window::Rolling(n) = window {
            assert!(n > 0, "rolling window length must be > 0");
        }
        Self {
            window,
            min_periods,
            buffer: VecDeque::new(),
        }
    }

    /// Push the next position, return the window statistics if warmed up.
    pub fn push(&mut self, value: Option<f64>) -> Option<WindowStats> {
        self.buffer.push_back(value.filter(|v| v.is_finite()));
        if let Window::Rolling(n) = self.window {
            while self.buffer.len() > n {
                let _ = self.buffer.pop_front();
            }
        }
        self.stats()
    }

    pub fn stats(&self) -> Option<WindowStats> {
        let count = self.defined_len();
        if count < self.min_periods || count == 0 {
            return None;
        }
        let n = count as f64;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in self.buffer.iter().flatten() {
            sum += *v;
            min = min.min(*v);
            max = max.max(*v);
        }
        let mean = sum / n;
        let variance = self
            .buffer
            .iter()
            .flatten()
            .map(|v| {
                let d = *v - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Some(WindowStats {
            count,
            mean,
            std: variance.max(0.0).sqrt(),
            min,
            max,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.defined_len() >= self.min_periods
    }

    fn defined_len(&self) -> usize {
        self.buffer.iter().filter(|v| v.is_some()).count()
    }
}

/// Window statistics for every position of `values`.
pub fn window_stats(
    values: &[Option<f64>],
    window: Window,
    min_periods: usize,
) -> Vec<Option<WindowStats>> {
    let mut w = RollingWindow::new(window, min_periods);
    values.iter().map(|v| w.push(*v)).collect()
}
