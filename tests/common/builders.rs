//! Test data builders for creating test objects

use attendance_rs::config::{AppConfig, StorageConfig};
use attendance_rs::session::SessionSummary;
use chrono::NaiveDate;
use std::path::Path;

/// Builder for configs whose CSV files live in a scratch directory
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    pub fn in_dir(dir: &Path) -> Self {
        let mut config = AppConfig::default();
        config.storage = StorageConfig::in_dir(dir);
        config.device.poll_interval_ms = 1;
        Self { config }
    }

    pub fn professor(mut self, uid: &str) -> Self {
        self.config.classroom.professor_uid = uid.to_string();
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.config.classroom.subject_id = subject.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

/// Builder for session history rows
pub struct SummaryBuilder {
    summary: SessionSummary,
}

impl SummaryBuilder {
    pub fn new(present_count: u32) -> Self {
        Self {
            summary: SessionSummary {
                date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
                subject_id: "EE-396".to_string(),
                professor_uid: "PROF1234".to_string(),
                present_count,
                avg_temperature: None,
                avg_humidity: None,
            },
        }
    }

    pub fn date(mut self, year: i32, month: u32, day: u32) -> Self {
        self.summary.date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        self
    }

    pub fn environment(mut self, temperature: f64, humidity: f64) -> Self {
        self.summary.avg_temperature = Some(temperature);
        self.summary.avg_humidity = Some(humidity);
        self
    }

    pub fn build(self) -> SessionSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_builder() {
        let summary = SummaryBuilder::new(7)
            .date(2025, 4, 1)
            .environment(22.5, 51.0)
            .build();

        assert_eq!(summary.present_count, 7);
        assert_eq!(summary.avg_temperature, Some(22.5));
        assert_eq!(summary.date.to_string(), "2025-04-01");
    }
}
