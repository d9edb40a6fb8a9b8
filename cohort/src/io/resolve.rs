//! Input file resolution inside `CAPS/subjects/<sub>/<ses>/`.
//!
//! Every query must match exactly one file per subject/session. The strict
//! reader reports all gaps at once; the filter drops incomplete images.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, instrument, warn};

use crate::core::pattern::InputQuery;
use crate::core::types::Cohort;
use crate::error::{CohortError, FileGap, GapKind, MissingFiles, Result};

/// Resolve every query for every image of `cohort`.
///
/// Returns one list per query, aligned with the cohort order. Fails with
/// [`CohortError::MissingFiles`] listing every missing or ambiguous match,
/// sorted by subject then session.
#[instrument(skip_all, fields(caps_dir = %caps_dir.display(), images = cohort.len(), queries = queries.len()))]
pub fn read_input_files(
    cohort: &Cohort,
    caps_dir: &Path,
    queries: &[InputQuery],
) -> Result<Vec<Vec<PathBuf>>> {
    let mut resolved = Vec::with_capacity(queries.len());
    let mut gaps = Vec::new();

    for query in queries {
        let mut files = Vec::with_capacity(cohort.len());
        for (subject, session) in cohort.pairs() {
            match match_one(caps_dir, subject, session, query)? {
                Ok(file) => files.push(file),
                Err(gap) => gaps.push(gap),
            }
        }
        resolved.push(files);
    }

    if !gaps.is_empty() {
        // Stable sort keeps query order within one image.
        gaps.sort_by(|a, b| (&a.subject, &a.session).cmp(&(&b.subject, &b.session)));
        warn!(gaps = gaps.len(), "input files missing");
        return Err(MissingFiles { gaps }.into());
    }
    debug!("all input files resolved");
    Ok(resolved)
}

/// Keep the images that have exactly one file matching `query`.
///
/// Returns the matched files and the filtered cohort, both in cohort order.
#[instrument(skip_all, fields(caps_dir = %caps_dir.display(), images = cohort.len()))]
pub fn filter_cohort(
    cohort: &Cohort,
    caps_dir: &Path,
    query: &InputQuery,
) -> Result<(Vec<PathBuf>, Cohort)> {
    let mut files = Vec::new();
    let mut kept = Vec::new();
    for (subject, session) in cohort.pairs() {
        match match_one(caps_dir, subject, session, query)? {
            Ok(file) => {
                files.push(file);
                kept.push((subject, session));
            }
            Err(gap) => {
                warn!(%gap, "image dropped");
            }
        }
    }
    debug!(kept = kept.len(), dropped = cohort.len() - kept.len(), "cohort filtered");
    Ok((files, Cohort::from_pairs(kept)))
}

/// Glob `query` inside one image folder.
///
/// The outer `Result` is a hard failure (bad pattern); the inner one is a gap.
fn match_one(
    caps_dir: &Path,
    subject: &str,
    session: &str,
    query: &InputQuery,
) -> Result<std::result::Result<PathBuf, FileGap>> {
    let image_dir = caps_dir.join("subjects").join(subject).join(session);
    let full = format!(
        "{}/{}",
        Pattern::escape(&image_dir.to_string_lossy()),
        query.pattern
    );
    let paths = glob::glob_with(&full, MatchOptions::new()).map_err(|err| {
        CohortError::InvalidPattern {
            pattern: query.pattern.clone(),
            reason: err.to_string(),
        }
    })?;
    // Unreadable entries are skipped the same way `glob` skips them.
    let mut matches: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
    matches.sort();

    let kind = match matches.len() {
        1 => return Ok(Ok(matches.remove(0))),
        0 => GapKind::Missing,
        count => GapKind::Ambiguous(count),
    };
    Ok(Err(FileGap {
        subject: subject.to_string(),
        session: session.to_string(),
        pattern: query.pattern.clone(),
        description: query.description.clone(),
        kind,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::T1_FREESURFER_TEMPLATE;
    use crate::core::pattern::{Hemisphere, surface_queries};
    use crate::test_support::TestDataset;

    fn cohort_of_three() -> Cohort {
        Cohort::from_pairs([
            ("sub-01", "ses-M00"),
            ("sub-02", "ses-M00"),
            ("sub-03", "ses-M00"),
        ])
    }

    #[test]
    fn resolves_one_file_per_image_and_query() {
        let dataset = TestDataset::new().expect("dataset");
        for subject in ["sub-01", "sub-02", "sub-03"] {
            dataset
                .add_thickness_files(subject, "ses-M00", 20, &Hemisphere::ALL)
                .expect("files");
        }
        let queries = surface_queries(T1_FREESURFER_TEMPLATE, 20).expect("queries");

        let resolved = read_input_files(&cohort_of_three(), dataset.root(), &queries)
            .expect("resolve");
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].len(), 3);
        assert!(resolved[0][1].ends_with("sub-02_ses-M00/surf/lh.thickness.fwhm20.fsaverage.mgh"));
        assert!(resolved[1][2].ends_with("sub-03_ses-M00/surf/rh.thickness.fwhm20.fsaverage.mgh"));
    }

    #[test]
    fn reports_only_the_missing_hemisphere() {
        let dataset = TestDataset::new().expect("dataset");
        dataset
            .add_thickness_files("sub-01", "ses-M00", 20, &Hemisphere::ALL)
            .expect("files");
        dataset
            .add_thickness_files("sub-02", "ses-M00", 20, &[Hemisphere::Left])
            .expect("files");
        dataset
            .add_thickness_files("sub-03", "ses-M00", 20, &Hemisphere::ALL)
            .expect("files");
        let queries = surface_queries(T1_FREESURFER_TEMPLATE, 20).expect("queries");

        let err = read_input_files(&cohort_of_three(), dataset.root(), &queries).unwrap_err();
        let CohortError::MissingFiles(missing) = err else {
            panic!("expected missing files");
        };
        assert_eq!(missing.gaps.len(), 1);
        let gap = &missing.gaps[0];
        assert_eq!(gap.subject, "sub-02");
        assert_eq!(gap.session, "ses-M00");
        assert_eq!(gap.kind, GapKind::Missing);
        assert!(gap.pattern.contains("rh.thickness"));
    }

    #[test]
    fn gaps_are_sorted_by_subject_then_session() {
        let dataset = TestDataset::new().expect("dataset");
        let cohort = Cohort::from_pairs([
            ("sub-02", "ses-M06"),
            ("sub-01", "ses-M00"),
            ("sub-02", "ses-M00"),
        ]);
        let queries = surface_queries(T1_FREESURFER_TEMPLATE, 20).expect("queries");

        let err = read_input_files(&cohort, dataset.root(), &queries).unwrap_err();
        let CohortError::MissingFiles(missing) = err else {
            panic!("expected missing files");
        };
        let order: Vec<_> = missing
            .gaps
            .iter()
            .map(|gap| {
                let hemi = if gap.pattern.contains("/lh.") { "lh" } else { "rh" };
                format!("{}/{}/{hemi}", gap.subject, gap.session)
            })
            .collect();
        assert_eq!(
            order,
            vec![
                "sub-01/ses-M00/lh",
                "sub-01/ses-M00/rh",
                "sub-02/ses-M00/lh",
                "sub-02/ses-M00/rh",
                "sub-02/ses-M06/lh",
                "sub-02/ses-M06/rh",
            ]
        );
    }

    #[test]
    fn multiple_matches_are_ambiguous() {
        let dataset = TestDataset::new().expect("dataset");
        dataset
            .touch("subjects/sub-01/ses-M00/pet/a_pet.nii")
            .expect("file");
        dataset
            .touch("subjects/sub-01/ses-M00/pet/b_pet.nii")
            .expect("file");
        let query = InputQuery {
            pattern: "pet/*_pet.nii".to_string(),
            description: "pet image".to_string(),
        };
        let cohort = Cohort::from_pairs([("sub-01", "ses-M00")]);

        let err = read_input_files(&cohort, dataset.root(), &[query]).unwrap_err();
        let CohortError::MissingFiles(missing) = err else {
            panic!("expected missing files");
        };
        assert_eq!(missing.gaps[0].kind, GapKind::Ambiguous(2));
    }

    #[test]
    fn invalid_glob_is_a_hard_error() {
        let dataset = TestDataset::new().expect("dataset");
        let query = InputQuery {
            pattern: "t1/[".to_string(),
            description: "broken".to_string(),
        };
        let cohort = Cohort::from_pairs([("sub-01", "ses-M00")]);

        let err = read_input_files(&cohort, dataset.root(), &[query]).unwrap_err();
        assert!(matches!(err, CohortError::InvalidPattern { .. }));
    }

    #[test]
    fn filter_keeps_only_complete_images() {
        let dataset = TestDataset::new().expect("dataset");
        dataset
            .touch("subjects/sub-01/ses-M00/t1/sub-01_ses-M00_gm.nii.gz")
            .expect("file");
        dataset
            .touch("subjects/sub-03/ses-M00/t1/sub-03_ses-M00_gm.nii")
            .expect("file");
        let query = InputQuery {
            pattern: "t1/*_gm.nii*".to_string(),
            description: "gray matter map".to_string(),
        };

        let (files, kept) = filter_cohort(&cohort_of_three(), dataset.root(), &query)
            .expect("filter");
        assert_eq!(kept.subjects(), ["sub-01", "sub-03"]);
        assert_eq!(files.len(), 2);
        assert!(files[1].ends_with("sub-03_ses-M00_gm.nii"));
    }
}
