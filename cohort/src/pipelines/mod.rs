//! Group pipelines: parameter checking and input resolution feeding an
//! external computation.
//!
//! A [`Pipeline`] only declares its workflow graph (named steps and the
//! fields flowing between them). Scheduling and the computation behind each
//! step belong to the caller.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::types::Cohort;

pub mod statistics_surface;
pub mod volume_parcellation;

/// One node of the workflow graph handed to the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowStep {
    pub name: &'static str,
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

/// Declarative contract of a group pipeline.
pub trait Pipeline {
    /// Folder name under the working directory.
    fn name(&self) -> &'static str;

    fn input_fields(&self) -> &'static [&'static str];

    fn output_fields(&self) -> &'static [&'static str];

    /// Core steps, in dependency order.
    fn core_steps(&self) -> Vec<WorkflowStep>;
}

/// Inputs shared by every group pipeline.
#[derive(Debug, Clone)]
pub struct GroupContext {
    pub caps_dir: PathBuf,
    pub group_label: String,
    pub cohort: Cohort,
    /// Participant table the cohort came from. May carry extra columns
    /// (covariates, factors) read by the computation.
    pub tsv_file: PathBuf,
    /// Working directory root.
    pub base_dir: PathBuf,
}

impl GroupContext {
    pub fn group_dir(&self) -> PathBuf {
        group_dir(&self.caps_dir, &self.group_label)
    }

    /// `<base_dir>/<pipeline>/group-<label>`
    pub fn working_dir(&self, pipeline: &str) -> PathBuf {
        self.base_dir
            .join(pipeline)
            .join(format!("group-{}", self.group_label))
    }
}

/// `CAPS/groups/group-<label>`
pub fn group_dir(caps_dir: &Path, group_label: &str) -> PathBuf {
    caps_dir.join("groups").join(format!("group-{group_label}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_dir_follows_caps_layout() {
        assert_eq!(
            group_dir(Path::new("/data/caps"), "ADvsHC"),
            PathBuf::from("/data/caps/groups/group-ADvsHC")
        );
    }
}
