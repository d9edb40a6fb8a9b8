//! Subject/session identifier extraction from BIDS and CAPS paths.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CohortError, Result};

/// `sub-<label>/ses-<label>` as two whole, adjacent path segments.
static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)(sub-[A-Za-z0-9]+)/(ses-[A-Za-z0-9]+)(?:/|$)").unwrap()
});

/// `sub-<label>_ses-<label>` inside a file or directory name, not glued to a
/// preceding letter or digit.
static IMAGE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9])(sub-[A-Za-z0-9]+)_(ses-[A-Za-z0-9]+)").unwrap()
});

/// Extract `sub-X_ses-Y` from a path containing `.../sub-X/ses-Y/...`.
pub fn subject_session_id(path: &str) -> Result<String> {
    let captures = SEGMENT_RE
        .captures(path)
        .ok_or_else(|| CohortError::Format {
            input: path.to_string(),
            expected: "sub-<label>/ses-<label> directories",
        })?;
    Ok(format!("{}_{}", &captures[1], &captures[2]))
}

/// Extract `sub-X_ses-Y` image ids from file names, one per input.
pub fn image_ids<S: AsRef<str>>(files: &[S]) -> Result<Vec<String>> {
    files
        .iter()
        .map(|file| {
            let file = file.as_ref();
            let captures = IMAGE_ID_RE
                .captures(file)
                .ok_or_else(|| CohortError::Format {
                    input: file.to_string(),
                    expected: "sub-<label>_ses-<label> in the file name",
                })?;
            Ok(format!("{}_{}", &captures[1], &captures[2]))
        })
        .collect()
}

/// Split image ids of `files` into parallel subject and session lists.
pub fn subjects_sessions_from_filenames<S: AsRef<str>>(
    files: &[S],
) -> Result<(Vec<String>, Vec<String>)> {
    let mut subjects = Vec::with_capacity(files.len());
    let mut sessions = Vec::with_capacity(files.len());
    for image_id in image_ids(files)? {
        // Labels are alphanumeric, so the first `_` is the separator.
        let (subject, session) = image_id
            .split_once('_')
            .ok_or_else(|| CohortError::Format {
                input: image_id.clone(),
                expected: "sub-<label>_ses-<label>",
            })?;
        subjects.push(subject.to_string());
        sessions.push(session.to_string());
    }
    Ok((subjects, sessions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_adjacent_segments() {
        let id = subject_session_id("root/sub-01/ses-M00/file.nii").expect("id");
        assert_eq!(id, "sub-01_ses-M00");
    }

    #[test]
    fn longer_label_is_not_truncated() {
        let id = subject_session_id("root/sub-010/ses-M00/file.nii").expect("id");
        assert_eq!(id, "sub-010_ses-M00");
        assert_ne!(id, "sub-01_ses-M00");
    }

    #[test]
    fn partial_segments_do_not_match() {
        assert!(subject_session_id("root/xsub-01/ses-M00/file.nii").is_err());
        assert!(subject_session_id("root/sub-01/ses-M00_extra/file.nii").is_err());
    }

    #[test]
    fn missing_session_is_format_error() {
        let err = subject_session_id("caps/subjects/sub-01/t1/file.nii").unwrap_err();
        assert!(matches!(err, CohortError::Format { .. }));
        assert!(err.to_string().contains("caps/subjects/sub-01/t1/file.nii"));
    }

    #[test]
    fn extracts_image_ids_from_file_names() {
        let files = [
            "/caps/sub-CLNC01/ses-M00/t1/sub-CLNC01_ses-M00_T1w.nii.gz",
            "sub-CLNC01_ses-M18_pet.nii",
        ];
        let ids = image_ids(&files).expect("ids");
        assert_eq!(ids, vec!["sub-CLNC01_ses-M00", "sub-CLNC01_ses-M18"]);
    }

    #[test]
    fn image_id_must_start_a_word() {
        let ids = image_ids(&["x-sub-01_ses-M00.nii", "/caps/acq_sub-02_ses-M06.nii"])
            .expect("ids");
        assert_eq!(ids, vec!["sub-01_ses-M00", "sub-02_ses-M06"]);

        let err = image_ids(&["xsub-01_ses-M00.nii"]).unwrap_err();
        assert!(matches!(err, CohortError::Format { .. }));
    }

    #[test]
    fn image_id_keeps_full_labels() {
        let ids = image_ids(&["sub-010_ses-M00_T1w.nii", "sub-01_ses-M006_T1w.nii"]).expect("ids");
        assert_eq!(ids, vec!["sub-010_ses-M00", "sub-01_ses-M006"]);
    }

    #[test]
    fn image_ids_fail_on_non_conforming_name() {
        let err = image_ids(&["scan_T1w.nii"]).unwrap_err();
        assert!(matches!(err, CohortError::Format { .. }));
    }

    #[test]
    fn splits_subjects_and_sessions() {
        let (subjects, sessions) = subjects_sessions_from_filenames(&[
            "sub-CLNC01_ses-M00_T1w.nii",
            "sub-CLNC01_ses-M18_T1w.nii",
            "sub-CLNC02_ses-M00_T1w.nii",
        ])
        .expect("split");
        assert_eq!(subjects, vec!["sub-CLNC01", "sub-CLNC01", "sub-CLNC02"]);
        assert_eq!(sessions, vec!["ses-M00", "ses-M18", "ses-M00"]);
    }
}
