//! Session state machine with dual-scan verification
//!
//! | State | Scan | Next | Outcome |
//! |---|---|---|---|
//! | Idle | professor | Active | `SessionOpened` |
//! | Idle | anyone else | Idle | `Rejected` |
//! | Active | professor | Idle | `SessionClosed(summary)` |
//! | Active | unseen uid | Active | `Entry` |
//! | Active | uid without exit | Active | `Present` |
//! | Active | uid with exit | Active | `Ignored` |
//!
//! Sensor samples are kept only while Active. A record with its exit set is
//! never modified again within the same session.

use crate::config::ClassroomConfig;
use crate::error::Result;
use crate::types::Timestamp;
use std::collections::hash_map::Entry;

use super::environment::EnvironmentSample;
use super::types::{AttendanceRecord, ScanOutcome, Session};

/// Session lifecycle state
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No session open
    #[default]
    Idle,
    /// A session is open
    Active(Session),
}

impl SessionState {
    /// Transition on an identity scan, returning the next state and the outcome
    pub fn on_scan(
        self,
        uid: &str,
        at: Timestamp,
        classroom: &ClassroomConfig,
    ) -> (SessionState, ScanOutcome) {
        let is_professor = uid == classroom.professor_uid;

        match self {
            SessionState::Idle if is_professor => {
                let session = Session::new(
                    classroom.subject_id.clone(),
                    classroom.professor_uid.clone(),
                    at,
                );
                (
                    SessionState::Active(session),
                    ScanOutcome::SessionOpened { started_at: at },
                )
            }
            SessionState::Idle => (SessionState::Idle, ScanOutcome::Rejected),
            SessionState::Active(session) if is_professor => {
                let summary = session.summarize();
                (SessionState::Idle, ScanOutcome::SessionClosed(summary))
            }
            SessionState::Active(mut session) => {
                let outcome = match session.records.entry(uid.to_string()) {
                    Entry::Vacant(slot) => {
                        slot.insert(AttendanceRecord {
                            entered_at: at,
                            exited_at: None,
                        });
                        ScanOutcome::Entry
                    }
                    Entry::Occupied(mut slot) => {
                        let record = slot.get_mut();
                        if record.exited_at.is_none() {
                            record.exited_at = Some(at);
                            ScanOutcome::Present
                        } else {
                            ScanOutcome::Ignored
                        }
                    }
                };
                (SessionState::Active(session), outcome)
            }
        }
    }

    /// Record a sensor sample; returns false (and drops it) when Idle
    pub fn on_sample(&mut self, sample: EnvironmentSample) -> bool {
        match self {
            SessionState::Active(session) => {
                session.environment.push(sample);
                true
            }
            SessionState::Idle => false,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }

    /// The open session, if any
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Active(session) => Some(session),
            SessionState::Idle => None,
        }
    }
}

/// Owns the session state for one classroom
#[derive(Debug, Clone)]
pub struct SessionMachine {
    classroom: ClassroomConfig,
    state: SessionState,
}

impl SessionMachine {
    /// Create an idle machine for the given classroom
    pub fn new(classroom: ClassroomConfig) -> Self {
        Self {
            classroom,
            state: SessionState::Idle,
        }
    }

    /// Feed one identity scan
    pub fn handle_scan(&mut self, uid: &str, at: Timestamp) -> ScanOutcome {
        let state = std::mem::take(&mut self.state);
        let (next, outcome) = state.on_scan(uid, at, &self.classroom);
        self.state = next;
        outcome
    }

    /// Feed one identity scan, rolling back if `commit` fails
    ///
    /// `commit` persists the outcome. On error the machine is left exactly
    /// as it was before the scan, so a failed close keeps the session open.
    pub fn try_scan<F>(&mut self, uid: &str, at: Timestamp, commit: F) -> Result<ScanOutcome>
    where
        F: FnOnce(&ScanOutcome) -> Result<()>,
    {
        let previous = self.state.clone();
        let outcome = self.handle_scan(uid, at);
        if let Err(e) = commit(&outcome) {
            self.state = previous;
            return Err(e);
        }
        Ok(outcome)
    }

    /// Feed one sensor sample; returns whether it was kept
    pub fn record_sample(&mut self, sample: EnvironmentSample) -> bool {
        self.state.on_sample(sample)
    }

    /// Drop the open session without summarizing it
    pub fn abandon(&mut self) -> Option<Session> {
        match std::mem::take(&mut self.state) {
            SessionState::Active(session) => Some(session),
            SessionState::Idle => None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session()
    }

    pub fn classroom(&self) -> &ClassroomConfig {
        &self.classroom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, TimeZone};

    const PROF: &str = "PROF1234";

    fn machine() -> SessionMachine {
        SessionMachine::new(ClassroomConfig::new(PROF, "EE-396"))
    }

    fn at(minute: i64) -> Timestamp {
        Local.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn sample(temperature: f64, humidity: f64) -> EnvironmentSample {
        EnvironmentSample {
            temperature,
            humidity,
        }
    }

    #[test]
    fn test_starts_idle() {
        let m = machine();
        assert!(!m.is_active());
        assert!(m.state().session().is_none());
    }

    #[test]
    fn test_student_rejected_while_idle() {
        let mut m = machine();
        assert_eq!(m.handle_scan("A1", at(0)), ScanOutcome::Rejected);
        assert!(!m.is_active());
    }

    #[test]
    fn test_professor_opens_and_closes() {
        let mut m = machine();
        assert_eq!(
            m.handle_scan(PROF, at(0)),
            ScanOutcome::SessionOpened { started_at: at(0) }
        );
        assert!(m.is_active());
        assert_eq!(m.session().unwrap().started_at, at(0));

        match m.handle_scan(PROF, at(60)) {
            ScanOutcome::SessionClosed(summary) => {
                assert_eq!(summary.present_count, 0);
                assert_eq!(summary.subject_id, "EE-396");
                assert_eq!(summary.professor_uid, PROF);
            }
            other => panic!("expected close, got {:?}", other),
        }
        assert!(!m.is_active());
    }

    #[test]
    fn test_dual_scan_sequence() {
        let mut m = machine();
        m.handle_scan(PROF, at(0));

        assert_eq!(m.handle_scan("A1", at(1)), ScanOutcome::Entry);
        assert_eq!(m.handle_scan("A1", at(50)), ScanOutcome::Present);
        assert_eq!(m.handle_scan("A1", at(51)), ScanOutcome::Ignored);
        assert_eq!(m.handle_scan("A1", at(52)), ScanOutcome::Ignored);

        let record = m.session().unwrap().record("A1").copied().unwrap();
        assert_eq!(record.entered_at, at(1));
        assert_eq!(record.exited_at, Some(at(50)));
    }

    #[test]
    fn test_completed_record_never_reopens() {
        let mut m = machine();
        m.handle_scan(PROF, at(0));
        m.handle_scan("A1", at(1));
        m.handle_scan("A1", at(2));
        m.handle_scan("A1", at(3));

        let record = m.session().unwrap().record("A1").copied().unwrap();
        assert_eq!(record.exited_at, Some(at(2)));
    }

    #[test]
    fn test_present_count_only_counts_completed_pairs() {
        let mut m = machine();
        m.handle_scan(PROF, at(0));
        m.handle_scan("A1", at(1));
        m.handle_scan("B2", at(2));
        m.handle_scan("A1", at(40));
        m.handle_scan("C3", at(41));

        match m.handle_scan(PROF, at(60)) {
            ScanOutcome::SessionClosed(summary) => assert_eq!(summary.present_count, 1),
            other => panic!("expected close, got {:?}", other),
        }
    }

    #[test]
    fn test_samples_only_recorded_while_active() {
        let mut m = machine();
        assert!(!m.record_sample(sample(10.0, 10.0)));

        m.handle_scan(PROF, at(0));
        assert!(m.record_sample(sample(25.0, 40.0)));
        assert!(m.record_sample(sample(27.0, 42.0)));

        let summary = match m.handle_scan(PROF, at(60)) {
            ScanOutcome::SessionClosed(summary) => summary,
            other => panic!("expected close, got {:?}", other),
        };
        assert_eq!(summary.avg_temperature, Some(26.0));
        assert_eq!(summary.avg_humidity, Some(41.0));

        // Samples after close are dropped and do not leak into the next session
        assert!(!m.record_sample(sample(99.0, 99.0)));
        m.handle_scan(PROF, at(120));
        assert!(m.session().unwrap().environment.is_empty());
    }

    #[test]
    fn test_session_without_samples_has_no_averages() {
        let mut m = machine();
        m.handle_scan(PROF, at(0));
        match m.handle_scan(PROF, at(1)) {
            ScanOutcome::SessionClosed(summary) => {
                assert_eq!(summary.avg_temperature, None);
                assert_eq!(summary.avg_humidity, None);
            }
            other => panic!("expected close, got {:?}", other),
        }
    }

    #[test]
    fn test_new_session_starts_with_fresh_records() {
        let mut m = machine();
        m.handle_scan(PROF, at(0));
        m.handle_scan("A1", at(1));
        m.handle_scan("A1", at(2));
        m.handle_scan(PROF, at(3));

        m.handle_scan(PROF, at(10));
        assert_eq!(m.handle_scan("A1", at(11)), ScanOutcome::Entry);
    }

    #[test]
    fn test_abandon_returns_open_session() {
        let mut m = machine();
        assert!(m.abandon().is_none());

        m.handle_scan(PROF, at(0));
        m.handle_scan("A1", at(1));
        let abandoned = m.abandon().unwrap();
        assert_eq!(abandoned.pending_count(), 1);
        assert!(!m.is_active());
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        use crate::error::AttendanceError;

        let mut m = machine();
        m.handle_scan(PROF, at(0));
        m.handle_scan("A1", at(1));

        let err = m.try_scan(PROF, at(60), |_| {
            Err(AttendanceError::Device("disk full".to_string()))
        });
        assert!(err.is_err());
        assert!(m.is_active());
        assert_eq!(m.session().unwrap().pending_count(), 1);

        let err = m.try_scan("A1", at(61), |_| {
            Err(AttendanceError::Device("disk full".to_string()))
        });
        assert!(err.is_err());
        assert!(m.session().unwrap().record("A1").unwrap().exited_at.is_none());

        let outcome = m.try_scan("A1", at(62), |_| Ok(())).unwrap();
        assert_eq!(outcome, ScanOutcome::Present);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_kth_scan_outcomes(
            scans in prop::collection::vec(0usize..4, 1..60)
        ) {
            let uids = ["A1", "B2", "C3", "D4"];
            let mut m = machine();
            m.handle_scan(PROF, at(0));

            let mut seen = [0usize; 4];
            for (i, &idx) in scans.iter().enumerate() {
                let outcome = m.handle_scan(uids[idx], at(i as i64 + 1));
                let expected = match seen[idx] {
                    0 => ScanOutcome::Entry,
                    1 => ScanOutcome::Present,
                    _ => ScanOutcome::Ignored,
                };
                prop_assert_eq!(outcome, expected);
                seen[idx] += 1;
            }

            let expected_present = seen.iter().filter(|&&n| n >= 2).count() as u32;
            match m.handle_scan(PROF, at(1000)) {
                ScanOutcome::SessionClosed(summary) => {
                    prop_assert_eq!(summary.present_count, expected_present);
                }
                other => prop_assert!(false, "expected close, got {:?}", other),
            }
        }
    }
}
