//! Error taxonomy shared by the `core` and `io` layers.
//!
//! Orchestration code (`pipelines`, the CLI) wraps these in `anyhow` with
//! context; callers that need to branch on a failure kind can still
//! `downcast_ref::<CohortError>()`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = CohortError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CohortError {
    /// Input does not follow the `sub-<label>`/`ses-<label>` naming convention.
    #[error("{input} does not contain subject and session information ({expected})")]
    Format {
        input: String,
        expected: &'static str,
    },

    /// A required file does not exist (or is not a regular file).
    #[error("expected a file at {}", path.display())]
    NotFound { path: PathBuf },

    /// A table is unreadable or lacks a required column.
    #[error("{}: {reason}", path.display())]
    Schema { path: PathBuf, reason: String },

    /// Length or shape mismatch between parallel sequences.
    #[error("{0}")]
    Validation(String),

    #[error("write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O failure on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan {}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Directory scan found no `sub-*` entry.
    #[error("{} is empty or not BIDS/CAPS compliant (no sub-* entry)", path.display())]
    EmptyDataset { path: PathBuf },

    #[error("parse {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("serialize {}", path.display())]
    ConfigSerialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("missing parameter `{name}`: {reason}")]
    MissingParameter { name: &'static str, reason: String },

    #[error("invalid value for `{name}`: expected {expected} (given: {value})")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: String,
    },

    #[error("`{name}` must lie in [{min}, {max}] (given: {value})")]
    Range {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid file pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("group already exists at {} (choose another label or delete the folder)", path.display())]
    GroupExists { path: PathBuf },

    #[error("group does not exist at {}", path.display())]
    GroupMissing { path: PathBuf },

    #[error(transparent)]
    MissingFiles(#[from] MissingFiles),
}

/// Why a subject/session pair could not be resolved for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapKind {
    Missing,
    Ambiguous(usize),
}

/// One unresolved subject/session/pattern combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGap {
    pub subject: String,
    pub session: String,
    pub pattern: String,
    pub description: String,
    pub kind: GapKind,
}

impl fmt::Display for FileGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            GapKind::Missing => write!(
                f,
                "{} | {}: no file matching {} ({})",
                self.subject, self.session, self.pattern, self.description
            ),
            GapKind::Ambiguous(count) => write!(
                f,
                "{} | {}: {count} files matching {} ({})",
                self.subject, self.session, self.pattern, self.description
            ),
        }
    }
}

/// Every gap found while resolving input files, sorted by subject then session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFiles {
    pub gaps: Vec<FileGap>,
}

impl fmt::Display for MissingFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} input file(s) could not be resolved:", self.gaps.len())?;
        for gap in &self.gaps {
            write!(f, "\n- {gap}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MissingFiles {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_lists_every_gap() {
        let err = CohortError::from(MissingFiles {
            gaps: vec![
                FileGap {
                    subject: "sub-01".to_string(),
                    session: "ses-M00".to_string(),
                    pattern: "surf/rh.mgh".to_string(),
                    description: "right hemisphere".to_string(),
                    kind: GapKind::Missing,
                },
                FileGap {
                    subject: "sub-02".to_string(),
                    session: "ses-M00".to_string(),
                    pattern: "surf/lh.mgh".to_string(),
                    description: "left hemisphere".to_string(),
                    kind: GapKind::Ambiguous(2),
                },
            ],
        });

        let message = err.to_string();
        assert!(message.starts_with("2 input file(s)"));
        assert!(message.contains("sub-01 | ses-M00: no file matching surf/rh.mgh"));
        assert!(message.contains("sub-02 | ses-M00: 2 files matching surf/lh.mgh"));
    }
}
