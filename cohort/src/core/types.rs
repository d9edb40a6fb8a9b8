//! Cohort types shared across discovery, aggregation, and resolution.

use serde::Serialize;

use crate::error::{CohortError, Result};

/// Flat enumeration of subject/session pairs.
///
/// `subjects[i]` and `sessions[i]` describe one image; a subject repeats once
/// per session. Both sequences always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cohort {
    subjects: Vec<String>,
    sessions: Vec<String>,
}

impl Cohort {
    pub fn new(subjects: Vec<String>, sessions: Vec<String>) -> Result<Self> {
        if subjects.len() != sessions.len() {
            return Err(CohortError::Validation(format!(
                "participant and session lists differ in length ({} participants, {} sessions)",
                subjects.len(),
                sessions.len()
            )));
        }
        Ok(Self { subjects, sessions })
    }

    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let (subjects, sessions) = pairs
            .into_iter()
            .map(|(subject, session)| (subject.into(), session.into()))
            .unzip();
        Self { subjects, sessions }
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn sessions(&self) -> &[String] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Iterate `(subject, session)` pairs in cohort order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.subjects
            .iter()
            .zip(&self.sessions)
            .map(|(subject, session)| (subject.as_str(), session.as_str()))
    }
}

/// Unique subjects with the sessions paired to each of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedCohort {
    pub subjects: Vec<String>,
    pub sessions: Vec<Vec<String>>,
}

impl GroupedCohort {
    /// Iterate `(subject, sessions)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.subjects
            .iter()
            .zip(&self.sessions)
            .map(|(subject, sessions)| (subject.as_str(), sessions.as_slice()))
    }

    /// Total number of sessions across all subjects.
    pub fn session_count(&self) -> usize {
        self.sessions.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_length_mismatch() {
        let err = Cohort::new(vec!["sub-01".to_string()], Vec::new()).unwrap_err();
        assert!(matches!(err, CohortError::Validation(_)));
        assert!(err.to_string().contains("1 participants, 0 sessions"));
    }

    #[test]
    fn pairs_follow_input_order() {
        let cohort = Cohort::from_pairs([("sub-02", "ses-M00"), ("sub-01", "ses-M06")]);
        let pairs: Vec<_> = cohort.pairs().collect();
        assert_eq!(pairs, vec![("sub-02", "ses-M00"), ("sub-01", "ses-M06")]);
    }
}
