//! Surface-based mass-univariate analysis of a group.
//!
//! The pipeline refuses to overwrite an existing CAPS group, resolves one
//! surface map per hemisphere and image, then hands everything to a
//! [`SurfaceModel`]. The model is a collaborator: tests use a capturing
//! implementation, production plugs in the numeric engine.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument};

use crate::core::params::{
    SurfaceParameters, SurfaceSettings, check_surface_parameters, validate_group_label,
};
use crate::core::pattern::{InputQuery, surface_queries};
use crate::core::types::Cohort;
use crate::error::CohortError;
use crate::io::resolve::read_input_files;
use crate::pipelines::{GroupContext, Pipeline, WorkflowStep};

pub const PIPELINE_NAME: &str = "statistics_surface";

/// Everything the model needs to fit one group.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub caps_dir: PathBuf,
    pub group_label: String,
    pub tsv_file: PathBuf,
    pub working_dir: PathBuf,
    pub settings: SurfaceSettings,
    pub cohort: Cohort,
    pub left_files: Vec<PathBuf>,
    pub right_files: Vec<PathBuf>,
}

/// The statistical model run by the `RunSurfStat` step.
pub trait SurfaceModel {
    /// Fit the model and return the directory holding its results.
    fn fit(&self, request: &ModelRequest) -> Result<PathBuf>;
}

/// Resolved hemisphere queries and their files.
#[derive(Debug, Clone, Serialize)]
pub struct SurfaceInputs {
    pub queries: Vec<InputQuery>,
    /// One list per query, aligned with the cohort.
    pub files: Vec<Vec<PathBuf>>,
}

#[derive(Debug, Clone)]
pub struct StatisticsSurface {
    context: GroupContext,
    settings: SurfaceSettings,
}

impl StatisticsSurface {
    /// Check the group label and `params`. Defaults are written back into
    /// `params`.
    pub fn new(context: GroupContext, params: &mut SurfaceParameters) -> Result<Self> {
        validate_group_label(&context.group_label)?;
        let settings = check_surface_parameters(params)
            .with_context(|| format!("invalid {PIPELINE_NAME} parameters"))?;
        Ok(Self { context, settings })
    }

    pub fn settings(&self) -> &SurfaceSettings {
        &self.settings
    }

    pub fn context(&self) -> &GroupContext {
        &self.context
    }

    /// Check the group is new and resolve both hemispheres for every image.
    #[instrument(skip_all, fields(group = %self.context.group_label, fwhm = self.settings.fwhm))]
    pub fn build_inputs(&self) -> Result<SurfaceInputs> {
        let group_dir = self.context.group_dir();
        if group_dir.exists() {
            return Err(CohortError::GroupExists { path: group_dir }.into());
        }

        let queries = surface_queries(&self.settings.custom_file, self.settings.fwhm)?;
        let files = read_input_files(&self.context.cohort, &self.context.caps_dir, &queries)
            .with_context(|| {
                format!(
                    "resolve {} input files for group-{}",
                    self.settings.measure_label, self.context.group_label
                )
            })?;
        Ok(SurfaceInputs { queries, files })
    }

    /// Resolve inputs, prepare the working directory and fit the model.
    ///
    /// Returns the model's output directory.
    pub fn run(&self, model: &dyn SurfaceModel) -> Result<PathBuf> {
        let inputs = self.build_inputs()?;
        let working_dir = self.context.working_dir(PIPELINE_NAME);
        fs::create_dir_all(&working_dir)
            .with_context(|| format!("create working directory {}", working_dir.display()))?;

        let mut files = inputs.files.into_iter();
        let request = ModelRequest {
            caps_dir: self.context.caps_dir.clone(),
            group_label: self.context.group_label.clone(),
            tsv_file: self.context.tsv_file.clone(),
            working_dir,
            settings: self.settings.clone(),
            cohort: self.context.cohort.clone(),
            left_files: files.next().unwrap_or_default(),
            right_files: files.next().unwrap_or_default(),
        };
        info!(
            group = %request.group_label,
            images = request.cohort.len(),
            glm_type = request.settings.glm_type.as_str(),
            "fitting surface model"
        );
        let output_dir = model.fit(&request).context("surface model failed")?;
        info!(output_dir = %output_dir.display(), "surface model finished");
        Ok(output_dir)
    }
}

impl Pipeline for StatisticsSurface {
    fn name(&self) -> &'static str {
        PIPELINE_NAME
    }

    fn input_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn output_fields(&self) -> &'static [&'static str] {
        &["output_dir"]
    }

    fn core_steps(&self) -> Vec<WorkflowStep> {
        vec![
            WorkflowStep {
                name: "0-InitPipeline",
                inputs: &["parameters", "group_id", "base_dir", "subjects_visits_tsv"],
                outputs: &["surfstat_results_dir"],
            },
            WorkflowStep {
                name: "RunSurfStat",
                inputs: &[
                    "caps_dir",
                    "output_dir",
                    "subjects_visits_tsv",
                    "pipeline_parameters",
                    "group_label",
                ],
                outputs: &["output_dir"],
            },
            WorkflowStep {
                name: "SaveToCaps",
                inputs: &["source_dir", "caps_dir", "overwrite_caps", "group_id", "glm_type"],
                outputs: &[],
            },
        ]
    }
}
