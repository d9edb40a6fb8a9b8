//! Pipeline parameter normalization and validation.
//!
//! Parameters arrive as a struct of optional fields (usually parsed from
//! TOML). Checking runs in two phases: `normalize_*` fills defaults in place,
//! then `validate_*` applies the checks in a fixed order, failing on the
//! first violation, and returns the typed settings handed to computation.
//! Running both phases again on their own output changes nothing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CohortError, Result};

pub const DEFAULT_FWHM: u32 = 20;
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.001;
pub const THICKNESS_MEASURE_LABEL: &str = "ct";

pub const T1_FREESURFER_TEMPLATE: &str = "@subject/@session/t1/freesurfer_cross_sectional/@subject_@session/surf/@hemi.thickness.fwhm@fwhm.fsaverage.mgh";

/// Projected PET template for a tracer and SUVR reference region.
pub fn pet_surface_template(acq_label: &str, suvr_reference_region: &str) -> String {
    format!(
        "@subject/@session/pet/surface/@subject_@session_trc-{acq_label}_pet_space-fsaverage_suvr-{suvr_reference_region}_pvc-iy_hemi-@hemi_fwhm-@fwhm_projection.mgh"
    )
}

/// Origin of the surface data fed to the statistical model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataCategory {
    #[serde(rename = "t1-freesurfer")]
    T1Freesurfer,
    #[serde(rename = "pet-surface")]
    PetSurface,
    #[serde(rename = "custom-pipeline")]
    CustomPipeline,
}

impl DataCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DataCategory::T1Freesurfer => "t1-freesurfer",
            DataCategory::PetSurface => "pet-surface",
            DataCategory::CustomPipeline => "custom-pipeline",
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GlmType {
    GroupComparison,
    Correlation,
}

impl GlmType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "group_comparison" => Some(GlmType::GroupComparison),
            "correlation" => Some(GlmType::Correlation),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GlmType::GroupComparison => "group_comparison",
            GlmType::Correlation => "correlation",
        }
    }
}

/// Raw statistics-surface parameters, as given by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceParameters {
    pub orig_input_data: Option<DataCategory>,
    pub contrast: Option<String>,
    pub glm_type: Option<String>,
    /// Whitespace separated covariate names.
    pub covariates: Option<String>,
    pub full_width_at_half_maximum: Option<u32>,
    pub cluster_threshold: Option<f64>,
    pub acq_label: Option<String>,
    pub suvr_reference_region: Option<String>,
    pub custom_file: Option<String>,
    pub measure_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PetOptions {
    pub acq_label: String,
    pub suvr_reference_region: String,
}

/// Validated statistics-surface settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceSettings {
    pub category: DataCategory,
    pub contrast: String,
    pub glm_type: GlmType,
    pub covariates: Vec<String>,
    pub fwhm: u32,
    pub cluster_threshold: f64,
    pub custom_file: String,
    pub measure_label: String,
    pub pet: Option<PetOptions>,
}

/// Normalize then validate, mutating `params` in place.
pub fn check_surface_parameters(params: &mut SurfaceParameters) -> Result<SurfaceSettings> {
    normalize_surface(params);
    validate_surface(params)
}

/// Insert defaults for every parameter the caller left unset.
///
/// `covariates`, `acq_label`, `suvr_reference_region` and `glm_type` default
/// to unset. `custom_file` and `measure_label` defaults depend on the data
/// category; a custom pipeline gets none.
pub fn normalize_surface(params: &mut SurfaceParameters) {
    params.full_width_at_half_maximum.get_or_insert(DEFAULT_FWHM);
    params
        .cluster_threshold
        .get_or_insert(DEFAULT_CLUSTER_THRESHOLD);
    if params.custom_file.is_none() {
        params.custom_file = default_custom_file(params);
    }
    if params.measure_label.is_none() {
        params.measure_label = default_measure_label(params);
    }
}

fn default_custom_file(params: &SurfaceParameters) -> Option<String> {
    match params.orig_input_data? {
        DataCategory::T1Freesurfer => Some(T1_FREESURFER_TEMPLATE.to_string()),
        DataCategory::PetSurface => {
            let acq_label = non_empty(&params.acq_label)?;
            let region = non_empty(&params.suvr_reference_region)?;
            Some(pet_surface_template(acq_label, region))
        }
        DataCategory::CustomPipeline => None,
    }
}

fn default_measure_label(params: &SurfaceParameters) -> Option<String> {
    match params.orig_input_data? {
        DataCategory::T1Freesurfer => Some(THICKNESS_MEASURE_LABEL.to_string()),
        DataCategory::PetSurface => non_empty(&params.acq_label).map(str::to_string),
        DataCategory::CustomPipeline => None,
    }
}

/// Check `params` and derive the category-specific file pattern and label.
///
/// Order matters: later checks assume earlier ones passed.
pub fn validate_surface(params: &mut SurfaceParameters) -> Result<SurfaceSettings> {
    let category = params
        .orig_input_data
        .ok_or(CohortError::MissingParameter {
            name: "orig_input_data",
            reason: "compulsory parameter".to_string(),
        })?;
    let contrast = non_empty(&params.contrast)
        .ok_or(CohortError::MissingParameter {
            name: "contrast",
            reason: "compulsory parameter".to_string(),
        })?
        .to_string();

    let source = match category {
        DataCategory::T1Freesurfer => InputSource::T1Freesurfer,
        DataCategory::PetSurface => InputSource::PetSurface(PetOptions {
            acq_label: required_for_pet(&params.acq_label, "acq_label", "acquisition label")?,
            suvr_reference_region: required_for_pet(
                &params.suvr_reference_region,
                "suvr_reference_region",
                "SUVR reference region",
            )?,
        }),
        DataCategory::CustomPipeline => InputSource::CustomPipeline,
    };

    let glm_type = params
        .glm_type
        .as_deref()
        .and_then(GlmType::parse)
        .ok_or_else(|| CohortError::InvalidValue {
            name: "glm_type",
            value: params.glm_type.clone().unwrap_or_else(|| "none".to_string()),
            expected: "group_comparison or correlation".to_string(),
        })?;

    let cluster_threshold = params
        .cluster_threshold
        .unwrap_or(DEFAULT_CLUSTER_THRESHOLD);
    if !(0.0..=1.0).contains(&cluster_threshold) {
        return Err(CohortError::Range {
            name: "cluster_threshold",
            value: cluster_threshold,
            min: 0.0,
            max: 1.0,
        });
    }

    match &source {
        InputSource::T1Freesurfer => {
            params.custom_file = Some(T1_FREESURFER_TEMPLATE.to_string());
            params.measure_label = Some(THICKNESS_MEASURE_LABEL.to_string());
        }
        InputSource::PetSurface(pet) => {
            params.custom_file = Some(pet_surface_template(
                &pet.acq_label,
                &pet.suvr_reference_region,
            ));
            params.measure_label = Some(pet.acq_label.clone());
        }
        InputSource::CustomPipeline => {
            for (name, value) in [
                ("custom_file", &params.custom_file),
                ("measure_label", &params.measure_label),
            ] {
                if non_empty(value).is_none() {
                    return Err(CohortError::MissingParameter {
                        name,
                        reason: format!(
                            "{category} requires both custom_file and measure_label"
                        ),
                    });
                }
            }
        }
    }

    Ok(SurfaceSettings {
        category,
        contrast,
        glm_type,
        covariates: params
            .covariates
            .as_deref()
            .map(|names| names.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        fwhm: params.full_width_at_half_maximum.unwrap_or(DEFAULT_FWHM),
        cluster_threshold,
        custom_file: params.custom_file.clone().unwrap_or_default(),
        measure_label: params.measure_label.clone().unwrap_or_default(),
        pet: match source {
            InputSource::PetSurface(pet) => Some(pet),
            InputSource::T1Freesurfer | InputSource::CustomPipeline => None,
        },
    })
}

/// Category plus the options only that category carries.
enum InputSource {
    T1Freesurfer,
    PetSurface(PetOptions),
    CustomPipeline,
}

fn required_for_pet(value: &Option<String>, name: &'static str, what: &str) -> Result<String> {
    non_empty(value).map(str::to_string).ok_or_else(|| {
        CohortError::MissingParameter {
            name,
            reason: format!("pet-surface requires the {what} (set --{name})"),
        }
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Volume atlases available for parcellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Atlas {
    #[serde(rename = "AAL2")]
    Aal2,
    #[serde(rename = "AICHA")]
    Aicha,
    Hammers,
    #[serde(rename = "LPBA40")]
    Lpba40,
    Neuromorphometrics,
}

impl Atlas {
    pub const ALL: [Atlas; 5] = [
        Atlas::Aal2,
        Atlas::Aicha,
        Atlas::Hammers,
        Atlas::Lpba40,
        Atlas::Neuromorphometrics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Atlas::Aal2 => "AAL2",
            Atlas::Aicha => "AICHA",
            Atlas::Hammers => "Hammers",
            Atlas::Lpba40 => "LPBA40",
            Atlas::Neuromorphometrics => "Neuromorphometrics",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcellationParameters {
    pub atlases: Option<Vec<Atlas>>,
    pub modulate: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcellationSettings {
    pub atlases: Vec<Atlas>,
    pub modulate: bool,
}

/// Default to every atlas with modulation on.
pub fn check_parcellation_parameters(
    params: &mut ParcellationParameters,
) -> Result<ParcellationSettings> {
    let atlases = params.atlases.get_or_insert_with(|| Atlas::ALL.to_vec());
    if atlases.is_empty() {
        return Err(CohortError::InvalidValue {
            name: "atlases",
            value: "[]".to_string(),
            expected: "at least one atlas".to_string(),
        });
    }
    let atlases = atlases.clone();
    let modulate = *params.modulate.get_or_insert(true);
    Ok(ParcellationSettings { atlases, modulate })
}

/// Group labels name CAPS folders (`groups/group-<label>`).
pub fn validate_group_label(label: &str) -> Result<()> {
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CohortError::InvalidValue {
            name: "group_label",
            value: label.to_string(),
            expected: "a non-empty alphanumeric label".to_string(),
        });
    }
    Ok(())
}
