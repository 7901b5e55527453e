//! Sliding-window accumulators shared by the indicators and strategy rules.
//!
//! Each push is O(1) amortized: running sums are updated on insert and evict
//! instead of re-scanning the window. Evictions leave rounding residue in the
//! sums, so they are rebuilt from the window contents once per `capacity`
//! evictions, and a window of identical values reports that value exactly.

use std::collections::VecDeque;

/// Fixed-capacity window over possibly-undefined values.
///
/// Statistics are only defined once the window is full and holds no
/// undefined cells.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<Option<f64>>,
    sum: f64,
    sum_sq: f64,
    missing: usize,
    evictions: usize,
    /// Length of the trailing run of values equal to `last`.
    run: usize,
    last: Option<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity + 1),
            sum: 0.0,
            sum_sq: 0.0,
            missing: 0,
            evictions: 0,
            run: 0,
            last: None,
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        if self.capacity == 0 {
            return;
        }
        match value {
            Some(v) => {
                self.sum += v;
                self.sum_sq += v * v;
                self.run = if self.last == Some(v) { self.run + 1 } else { 1 };
            }
            None => {
                self.missing += 1;
                self.run = 0;
            }
        }
        self.last = value;
        self.values.push_back(value);

        if self.values.len() > self.capacity {
            match self.values.pop_front().flatten() {
                Some(old) => {
                    self.sum -= old;
                    self.sum_sq -= old * old;
                }
                None => self.missing -= 1,
            }
            self.evictions += 1;
            if self.evictions >= self.capacity {
                self.rebuild();
            }
        }
    }

    fn rebuild(&mut self) {
        self.sum = self.defined_values().sum();
        self.sum_sq = self.defined_values().map(|v| v * v).sum();
        self.evictions = 0;
    }

    fn flat_value(&self) -> Option<f64> {
        if self.run >= self.capacity { self.last } else { None }
    }

    pub fn is_ready(&self) -> bool {
        self.capacity > 0 && self.values.len() == self.capacity && self.missing == 0
    }

    pub fn mean(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        Some(self.flat_value().unwrap_or(self.sum / self.capacity as f64))
    }

    /// Sample variance (n-1 divisor). Undefined for a window of one.
    pub fn sample_variance(&self) -> Option<f64> {
        if !self.is_ready() || self.capacity < 2 {
            return None;
        }
        if self.flat_value().is_some() {
            return Some(0.0);
        }
        let n = self.capacity as f64;
        let var = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        Some(var.max(0.0))
    }

    pub fn sample_std(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    /// Values currently in the window, oldest first. Only meaningful when ready.
    pub fn defined_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flatten().copied()
    }
}

/// Rolling maximum or minimum using a monotonic deque of (index, value).
#[derive(Debug, Clone)]
pub struct RollingExtreme {
    capacity: usize,
    keep_max: bool,
    deque: VecDeque<(usize, f64)>,
    seen: usize,
}

impl RollingExtreme {
    pub fn max(capacity: usize) -> Self {
        Self::new(capacity, true)
    }

    pub fn min(capacity: usize) -> Self {
        Self::new(capacity, false)
    }

    fn new(capacity: usize, keep_max: bool) -> Self {
        Self {
            capacity,
            keep_max,
            deque: VecDeque::with_capacity(capacity),
            seen: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        let idx = self.seen;
        self.seen += 1;
        while let Some(&(_, back)) = self.deque.back() {
            let dominated = if self.keep_max {
                back <= value
            } else {
                back >= value
            };
            if !dominated {
                break;
            }
            self.deque.pop_back();
        }
        self.deque.push_back((idx, value));
        while let Some(&(front_idx, _)) = self.deque.front() {
            if front_idx + self.capacity <= idx {
                self.deque.pop_front();
            } else {
                break;
            }
        }
    }

    /// Extreme of the last `capacity` values, once that many have been seen.
    pub fn value(&self) -> Option<f64> {
        if self.capacity == 0 || self.seen < self.capacity {
            return None;
        }
        self.deque.front().map(|&(_, v)| v)
    }
}

/// Rolling sample covariance of paired observations and variance of the second.
#[derive(Debug, Clone)]
pub struct RollingCovariance {
    capacity: usize,
    pairs: VecDeque<Option<(f64, f64)>>,
    sum_x: f64,
    sum_y: f64,
    sum_xy: f64,
    sum_yy: f64,
    missing: usize,
    evictions: usize,
}

impl RollingCovariance {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pairs: VecDeque::with_capacity(capacity + 1),
            sum_x: 0.0,
            sum_y: 0.0,
            sum_xy: 0.0,
            sum_yy: 0.0,
            missing: 0,
            evictions: 0,
        }
    }

    pub fn push(&mut self, pair: Option<(f64, f64)>) {
        if self.capacity == 0 {
            return;
        }
        match pair {
            Some((x, y)) => self.apply(x, y, 1.0),
            None => self.missing += 1,
        }
        self.pairs.push_back(pair);
        if self.pairs.len() > self.capacity {
            match self.pairs.pop_front().flatten() {
                Some((x, y)) => self.apply(x, y, -1.0),
                None => self.missing -= 1,
            }
            self.evictions += 1;
            if self.evictions >= self.capacity {
                self.rebuild();
            }
        }
    }

    fn rebuild(&mut self) {
        self.sum_x = 0.0;
        self.sum_y = 0.0;
        self.sum_xy = 0.0;
        self.sum_yy = 0.0;
        let pairs: Vec<(f64, f64)> = self.pairs.iter().flatten().copied().collect();
        for (x, y) in pairs {
            self.apply(x, y, 1.0);
        }
        self.evictions = 0;
    }

    fn apply(&mut self, x: f64, y: f64, sign: f64) {
        self.sum_x += sign * x;
        self.sum_y += sign * y;
        self.sum_xy += sign * x * y;
        self.sum_yy += sign * y * y;
    }

    fn is_ready(&self) -> bool {
        self.capacity >= 2 && self.pairs.len() == self.capacity && self.missing == 0
    }

    /// cov(x, y) / var(y), undefined when var(y) is effectively zero.
    pub fn beta(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        let n = self.capacity as f64;
        let cov = (self.sum_xy - self.sum_x * self.sum_y / n) / (n - 1.0);
        let var_y = ((self.sum_yy - self.sum_y * self.sum_y / n) / (n - 1.0)).max(0.0);
        if var_y <= 1e-12 {
            return None;
        }
        Some(cov / var_y)
    }
}

/// Simple moving average over a possibly-undefined series.
pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut window = RollingWindow::new(period);
    values
        .iter()
        .map(|v| {
            window.push(*v);
            window.mean()
        })
        .collect()
}
