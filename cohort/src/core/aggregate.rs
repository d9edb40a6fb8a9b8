//! Collapse a flat cohort into per-subject session lists.

use std::collections::BTreeMap;

use crate::core::types::{Cohort, GroupedCohort};

/// Group sessions by subject.
///
/// Unique subjects come out in lexicographic order; each subject's sessions
/// keep their relative order from the input. The total number of grouped
/// sessions always equals `cohort.len()`.
pub fn group_by_subject(cohort: &Cohort) -> GroupedCohort {
    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (subject, session) in cohort.pairs() {
        grouped
            .entry(subject)
            .or_default()
            .push(session.to_string());
    }

    let (subjects, sessions) = grouped
        .into_iter()
        .map(|(subject, sessions)| (subject.to_string(), sessions))
        .unzip();
    GroupedCohort { subjects, sessions }
}
