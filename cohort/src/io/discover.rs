//! Cohort discovery over BIDS and CAPS directories.
//!
//! A scan is persisted as a timestamped participant table and read back
//! through [`read_table`], so scanned and user-supplied cohorts go through
//! the same parsing path and the table used for a run stays on disk.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::core::types::Cohort;
use crate::error::{CohortError, Result};
use crate::io::table::{read_session_ids, read_table, write_cohort};

/// Directory convention of the scanned dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatasetLayout {
    /// `root/sub-*/ses-*`
    #[default]
    Bids,
    /// `root/subjects/sub-*/ses-*`
    Caps,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// Participant table to use instead of scanning.
    pub table: Option<PathBuf>,
    pub layout: DatasetLayout,
    /// List sessions from `sub-X/sub-X_sessions.tsv` instead of `ses-*` folders.
    pub use_session_tables: bool,
    /// Where the scanned table is written. A kept temporary directory when unset.
    pub cache_dir: Option<PathBuf>,
}

/// Produce the cohort for `root`, from `options.table` when given.
pub fn discover(root: &Path, options: &DiscoverOptions) -> Result<Cohort> {
    locate_table(root, options).map(|located| located.cohort)
}

/// A cohort and the participant table it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedCohort {
    pub cohort: Cohort,
    pub table: PathBuf,
}

/// Like [`discover`], also returning `options.table` or the cached scan table.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn locate_table(root: &Path, options: &DiscoverOptions) -> Result<LocatedCohort> {
    if let Some(table) = &options.table {
        debug!(table = %table.display(), "using participant table");
        return Ok(LocatedCohort {
            cohort: read_table(table)?,
            table: table.clone(),
        });
    }

    let scanned = scan_dataset(root, options.layout, options.use_session_tables)?;
    let cache_dir = match &options.cache_dir {
        Some(dir) => dir.clone(),
        None => create_cache_dir()?,
    };
    let file_name = cache_table_name(Local::now().naive_local());
    let table = write_cohort(&scanned, &cache_dir, Some(&file_name))?;
    info!(path = %table.display(), rows = scanned.len(), "subject/session list cached");
    Ok(LocatedCohort {
        cohort: read_table(&table)?,
        table,
    })
}

/// `subjects_sessions_list_<YYYYMMDD_HHMMSS>.tsv`
pub fn cache_table_name(at: NaiveDateTime) -> String {
    format!("subjects_sessions_list_{}.tsv", at.format("%Y%m%d_%H%M%S"))
}

fn create_cache_dir() -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix("cohort-")
        .tempdir()
        .map_err(|source| CohortError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
    Ok(dir.keep())
}

/// List subject/session pairs in sorted name order.
pub fn scan_dataset(root: &Path, layout: DatasetLayout, use_session_tables: bool) -> Result<Cohort> {
    let search_dir = match layout {
        DatasetLayout::Bids => root.to_path_buf(),
        DatasetLayout::Caps => root.join("subjects"),
    };
    if !search_dir.is_dir() {
        return Err(CohortError::EmptyDataset { path: search_dir });
    }

    let subjects = list_dirs(&search_dir, "sub-")?;
    if subjects.is_empty() {
        return Err(CohortError::EmptyDataset { path: search_dir });
    }

    let mut pairs = Vec::new();
    for (subject, subject_dir) in &subjects {
        if use_session_tables {
            let sidecar = subject_dir.join(format!("{subject}_sessions.tsv"));
            if !sidecar.is_file() {
                warn!(sidecar = %sidecar.display(), "sessions table missing, subject skipped");
                continue;
            }
            for session in read_session_ids(&sidecar)? {
                pairs.push((subject.clone(), session));
            }
        } else {
            for (session, _) in list_dirs(subject_dir, "ses-")? {
                pairs.push((subject.clone(), session));
            }
        }
    }

    debug!(
        subjects = subjects.len(),
        images = pairs.len(),
        "dataset scanned"
    );
    Ok(Cohort::from_pairs(pairs))
}

/// Direct child directories of `dir` whose name starts with `prefix`.
fn list_dirs(dir: &Path, prefix: &str) -> Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| CohortError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.starts_with(prefix) {
            found.push((name.to_string(), entry.into_path()));
        }
    }
    Ok(found)
}
