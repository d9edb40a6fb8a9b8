//! Mean gray matter concentration per atlas region.
//!
//! Works on DARTEL outputs of an existing group. Images without a gray
//! matter map are dropped from the cohort instead of failing the run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument};

use crate::core::params::{
    Atlas, ParcellationParameters, ParcellationSettings, check_parcellation_parameters,
    validate_group_label,
};
use crate::core::pattern::InputQuery;
use crate::core::types::Cohort;
use crate::error::CohortError;
use crate::io::resolve::filter_cohort;
use crate::pipelines::{GroupContext, Pipeline, WorkflowStep};

pub const PIPELINE_NAME: &str = "t1_volume_parcellation";

/// Gray matter probability map in Ixi549 space for `group-<label>`.
pub fn gray_matter_query(group_label: &str, modulate: bool) -> InputQuery {
    let modulated = if modulate { "on" } else { "off" };
    InputQuery {
        pattern: format!(
            "t1/spm/dartel/group-{group_label}/*_T1w_segm-graymatter_space-Ixi549Space_modulated-{modulated}_probability.nii*"
        ),
        description: format!(
            "graymatter tissue probability map based on group-{group_label} DARTEL template in MNI space (modulated {modulated})"
        ),
    }
}

/// Values of the `file_list` and `atlas_list` input fields.
#[derive(Debug, Clone, Serialize)]
pub struct ParcellationInputs {
    pub file_list: Vec<PathBuf>,
    pub atlas_list: Vec<Atlas>,
    /// Images kept after filtering, aligned with `file_list`.
    pub cohort: Cohort,
}

#[derive(Debug, Clone)]
pub struct VolumeParcellation {
    context: GroupContext,
    settings: ParcellationSettings,
}

impl VolumeParcellation {
    pub fn new(context: GroupContext, params: &mut ParcellationParameters) -> Result<Self> {
        validate_group_label(&context.group_label)?;
        let settings = check_parcellation_parameters(params)
            .with_context(|| format!("invalid {PIPELINE_NAME} parameters"))?;
        Ok(Self { context, settings })
    }

    pub fn settings(&self) -> &ParcellationSettings {
        &self.settings
    }

    pub fn context(&self) -> &GroupContext {
        &self.context
    }

    /// Require the group and keep the images that have a gray matter map.
    #[instrument(skip_all, fields(group = %self.context.group_label, modulate = self.settings.modulate))]
    pub fn build_inputs(&self) -> Result<ParcellationInputs> {
        let group_dir = self.context.group_dir();
        if !group_dir.is_dir() {
            return Err(CohortError::GroupMissing { path: group_dir })
                .context("run t1-volume or t1-volume-create-dartel first");
        }

        let query = gray_matter_query(&self.context.group_label, self.settings.modulate);
        let (file_list, cohort) =
            filter_cohort(&self.context.cohort, &self.context.caps_dir, &query)?;
        if !cohort.is_empty() {
            info!(images = cohort.len(), "images to process");
        }
        Ok(ParcellationInputs {
            file_list,
            atlas_list: self.settings.atlases.clone(),
            cohort,
        })
    }
}

impl Pipeline for VolumeParcellation {
    fn name(&self) -> &'static str {
        PIPELINE_NAME
    }

    fn input_fields(&self) -> &'static [&'static str] {
        &["file_list", "atlas_list"]
    }

    fn output_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn core_steps(&self) -> Vec<WorkflowStep> {
        vec![
            WorkflowStep {
                name: "atlas_stats_node",
                inputs: &["in_image", "atlas_list"],
                outputs: &["atlas_statistics"],
            },
            WorkflowStep {
                name: "outputnode",
                inputs: &["atlas_statistics"],
                outputs: &["atlas_statistics"],
            },
            WorkflowStep {
                name: "datasink",
                inputs: &["atlas_statistics"],
                outputs: &[],
            },
        ]
    }
}
