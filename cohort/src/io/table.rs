//! Participant/session TSV tables (`participant_id\tsession_id`).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::core::types::Cohort;
use crate::error::{CohortError, Result};

pub const PARTICIPANT_COLUMN: &str = "participant_id";
pub const SESSION_COLUMN: &str = "session_id";
pub const DEFAULT_TABLE_NAME: &str = "participants.tsv";

/// Read participant and session ids, in row order, trimmed of whitespace.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_table(path: &Path) -> Result<Cohort> {
    let mut columns = read_columns(path, &[PARTICIPANT_COLUMN, SESSION_COLUMN])?;
    let sessions = columns.pop().unwrap_or_default();
    let subjects = columns.pop().unwrap_or_default();
    debug!(rows = subjects.len(), "participant table loaded");
    Cohort::new(subjects, sessions)
}

/// Read the `session_id` column of a BIDS `sub-X_sessions.tsv` sidecar.
pub(crate) fn read_session_ids(path: &Path) -> Result<Vec<String>> {
    let mut columns = read_columns(path, &[SESSION_COLUMN])?;
    Ok(columns.pop().unwrap_or_default())
}

fn read_columns(path: &Path, names: &[&str]) -> Result<Vec<Vec<String>>> {
    if !path.is_file() {
        return Err(CohortError::NotFound {
            path: path.to_path_buf(),
        });
    }
    // Rows may be shorter or longer than the header; only required cells count.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .map_err(|err| schema_error(path, format!("unreadable table: {err}")))?;
    let headers = reader
        .headers()
        .map_err(|err| schema_error(path, format!("unreadable header: {err}")))?
        .clone();
    let indices = names
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|header| header == *name)
                .ok_or_else(|| schema_error(path, format!("missing {name} column")))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut columns = vec![Vec::new(); names.len()];
    for (index, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let record = record.map_err(|err| schema_error(path, format!("line {line}: {err}")))?;
        for ((column, &field), name) in columns.iter_mut().zip(&indices).zip(names) {
            let value = record.get(field).unwrap_or_default().trim();
            if value.is_empty() {
                return Err(schema_error(path, format!("line {line}: empty {name}")));
            }
            column.push(value.to_string());
        }
    }
    Ok(columns)
}

fn schema_error(path: &Path, reason: String) -> CohortError {
    CohortError::Schema {
        path: path.to_path_buf(),
        reason,
    }
}

/// Write `out_dir/<file_name>` (default `participants.tsv`), creating `out_dir`.
///
/// Returns the path of the written table.
#[instrument(skip_all, fields(out_dir = %out_dir.display(), rows = subjects.len()))]
pub fn write_table<S: AsRef<str>, T: AsRef<str>>(
    subjects: &[S],
    sessions: &[T],
    out_dir: &Path,
    file_name: Option<&str>,
) -> Result<PathBuf> {
    if subjects.len() != sessions.len() {
        return Err(CohortError::Validation(format!(
            "cannot write participant table: {} participants but {} sessions",
            subjects.len(),
            sessions.len()
        )));
    }

    // `create_dir_all` tolerates the directory appearing concurrently.
    fs::create_dir_all(out_dir).map_err(|source| CohortError::Write {
        path: out_dir.to_path_buf(),
        source: source.into(),
    })?;

    let path = out_dir.join(file_name.unwrap_or(DEFAULT_TABLE_NAME));
    write_rows(&path, subjects, sessions).map_err(|source| CohortError::Write {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), "participant table written");
    Ok(path)
}

/// Write every pair of `cohort`, see [`write_table`].
pub fn write_cohort(cohort: &Cohort, out_dir: &Path, file_name: Option<&str>) -> Result<PathBuf> {
    write_table(cohort.subjects(), cohort.sessions(), out_dir, file_name)
}

fn write_rows<S: AsRef<str>, T: AsRef<str>>(
    path: &Path,
    subjects: &[S],
    sessions: &[T],
) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    writer.write_record([PARTICIPANT_COLUMN, SESSION_COLUMN])?;
    for (subject, session) in subjects.iter().zip(sessions) {
        writer.write_record([subject.as_ref(), session.as_ref()])?;
    }
    writer.flush()?;
    Ok(())
}
