//! Crash file entries reported in a workflow log.

use std::fs;
use std::path::Path;

use tracing::{debug, instrument};

use crate::error::{CohortError, Result};

const CRASH_MARKER: &str = "crashfile:";

/// Every crash file listed in `log`, in log order.
///
/// A matching line looks like `<prefix>\t crashfile:/path/to/crash.pklz`.
#[instrument(skip_all, fields(log = %log.display()))]
pub fn crash_files(log: &Path) -> Result<Vec<String>> {
    if !log.is_file() {
        return Err(CohortError::NotFound {
            path: log.to_path_buf(),
        });
    }
    let contents = fs::read_to_string(log).map_err(|source| CohortError::Io {
        path: log.to_path_buf(),
        source,
    })?;
    let files: Vec<String> = contents
        .lines()
        .filter(|line| line.contains(CRASH_MARKER))
        .map(|line| line.replace("\t crashfile:", "").trim_end_matches('\r').to_string())
        .collect();
    debug!(count = files.len(), "crash files listed");
    Ok(files)
}
