//! Next-session attendance forecast
//!
//! The history table's 1-based row index is the independent variable and
//! the session's present count the dependent one. A straight line is fitted
//! over every row (no window) and evaluated at `rows + 1`. Fewer than two
//! rows produce no forecast.

/// Minimum number of sessions needed for a fit
pub const MIN_FORECAST_SAMPLES: usize = 2;

/// A fitted line `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearTrend {
    /// Least-squares fit of `values[i]` against `x = i + 1`
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.len() < MIN_FORECAST_SAMPLES {
            return None;
        }

        let n = values.len() as f64;
        let mean_x = (n + 1.0) / 2.0;
        let mean_y = values.iter().sum::<f64>() / n;

        let (sxy, sxx) = values
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
                let dx = (i + 1) as f64 - mean_x;
                (sxy + dx * (y - mean_y), sxx + dx * dx)
            });

        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    /// Evaluate the line at `x`
    pub fn evaluate(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Predicted attendance for the session after the last recorded one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    /// Row index the prediction is for (`rows + 1`)
    pub next_index: usize,
    /// Raw value of the fitted line at `next_index`
    pub predicted: f64,
    /// The fitted line
    pub trend: LinearTrend,
}

impl Forecast {
    fn from_trend(trend: LinearTrend, rows: usize) -> Self {
        let next_index = rows + 1;
        Self {
            next_index,
            predicted: trend.evaluate(next_index as f64),
            trend,
        }
    }

    /// Prediction rounded to a whole number of students
    ///
    /// Halves round to even.
    pub fn rounded(&self) -> i64 {
        self.predicted.round_ties_even() as i64
    }
}

/// Forecast the next session from the full list of present counts
pub fn forecast_next(counts: &[u32]) -> Option<Forecast> {
    let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    LinearTrend::fit(&values).map(|trend| Forecast::from_trend(trend, values.len()))
}

/// Running sums of x, y, xy and x² for incremental fitting
///
/// Pushing a new session is O(1); the fit agrees with [`LinearTrend::fit`]
/// up to floating point rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrendAccumulator {
    n: usize,
    sum_x: f64,
    sum_y: f64,
    sum_xy: f64,
    sum_xx: f64,
}

impl TrendAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from existing history in row order
    pub fn from_counts(counts: impl IntoIterator<Item = u32>) -> Self {
        let mut acc = Self::new();
        for count in counts {
            acc.push(count);
        }
        acc
    }

    /// Append the next row's present count
    pub fn push(&mut self, count: u32) {
        self.n += 1;
        let x = self.n as f64;
        let y = count as f64;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xy += x * y;
        self.sum_xx += x * x;
    }

    /// Number of rows accumulated
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn trend(&self) -> Option<LinearTrend> {
        if self.n < MIN_FORECAST_SAMPLES {
            return None;
        }
        let n = self.n as f64;
        let denominator = n * self.sum_xx - self.sum_x * self.sum_x;
        let slope = (n * self.sum_xy - self.sum_x * self.sum_y) / denominator;
        Some(LinearTrend {
            slope,
            intercept: (self.sum_y - slope * self.sum_x) / n,
        })
    }

    pub fn forecast(&self) -> Option<Forecast> {
        self.trend().map(|trend| Forecast::from_trend(trend, self.n))
    }
}
