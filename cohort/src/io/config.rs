//! Pipeline parameters stored as TOML.
//!
//! One table per pipeline:
//!
//! ```toml
//! [statistics_surface]
//! orig_input_data = "t1-freesurfer"
//! contrast = "group"
//! glm_type = "group_comparison"
//!
//! [volume_parcellation]
//! atlases = ["AAL2", "Hammers"]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::params::{ParcellationParameters, SurfaceParameters};
use crate::error::{CohortError, Result};

/// Raw, unvalidated parameters for every pipeline.
///
/// Missing tables and keys stay unset; checking happens when a pipeline is
/// built from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub statistics_surface: SurfaceParameters,
    pub volume_parcellation: ParcellationParameters,
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PipelineConfig::default()`.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(PipelineConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| io_error(path, source))?;
    toml::from_str(&contents).map_err(|source| CohortError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PipelineConfig) -> Result<()> {
    let mut buf = toml::to_string_pretty(cfg).map_err(|source| CohortError::ConfigSerialize {
        path: path.to_path_buf(),
        source,
    })?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents).map_err(|source| io_error(&tmp_path, source))?;
    fs::rename(&tmp_path, path).map_err(|source| io_error(path, source))?;
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> CohortError {
    CohortError::Io {
        path: path.to_path_buf(),
        source,
    }
}
