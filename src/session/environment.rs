//! Environmental sample aggregation scoped to one session
//!
//! An [`EnvironmentAggregator`] lives inside an open session and is dropped
//! with it, so samples taken while no session is open never reach it.

/// A single temperature/humidity reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSample {
    /// Temperature in °C
    pub temperature: f64,
    /// Relative humidity in %
    pub humidity: f64,
}

/// Session averages; `None` means no sample was collected
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvironmentAverages {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Collects the temperature and humidity sequences of one session
#[derive(Debug, Clone, Default)]
pub struct EnvironmentAggregator {
    temperatures: Vec<f64>,
    humidities: Vec<f64>,
}

impl EnvironmentAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one reading to both sequences
    pub fn push(&mut self, sample: EnvironmentSample) {
        self.temperatures.push(sample.temperature);
        self.humidities.push(sample.humidity);
    }

    /// Number of readings collected
    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    /// Whether no reading has been collected
    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    /// Most recent reading
    pub fn latest(&self) -> Option<EnvironmentSample> {
        match (self.temperatures.last(), self.humidities.last()) {
            (Some(&temperature), Some(&humidity)) => Some(EnvironmentSample {
                temperature,
                humidity,
            }),
            _ => None,
        }
    }

    /// Temperature samples in arrival order
    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Humidity samples in arrival order
    pub fn humidities(&self) -> &[f64] {
        &self.humidities
    }

    /// Arithmetic means of both sequences, computed independently
    pub fn averages(&self) -> EnvironmentAverages {
        EnvironmentAverages {
            temperature: mean(&self.temperatures),
            humidity: mean(&self.humidities),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
