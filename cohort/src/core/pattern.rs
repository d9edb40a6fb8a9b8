//! File pattern queries over CAPS-relative templates.
//!
//! Templates name per-image files with `@subject`, `@session`, `@hemi` and
//! `@fwhm` placeholders, e.g.
//! `@subject/@session/t1/freesurfer_cross_sectional/@subject_@session/surf/@hemi.thickness.fwhm@fwhm.fsaverage.mgh`.
//! A query fills the placeholders with globs and concrete values, then strips
//! the leading `sub-*/ses-*/` so the result is relative to one image folder.

use serde::Serialize;

use crate::error::{CohortError, Result};

/// Subject/session directories every template must walk through.
pub const SUBJECT_SESSION_PREFIX: &str = "sub-*/ses-*/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Hemisphere {
    Left,
    Right,
}

impl Hemisphere {
    pub const ALL: [Hemisphere; 2] = [Hemisphere::Left, Hemisphere::Right];

    /// FreeSurfer hemisphere code.
    pub fn code(self) -> &'static str {
        match self {
            Hemisphere::Left => "lh",
            Hemisphere::Right => "rh",
        }
    }

    pub fn direction(self) -> &'static str {
        match self {
            Hemisphere::Left => "left",
            Hemisphere::Right => "right",
        }
    }
}

/// Values substituted into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatternQuery {
    pub subject: String,
    pub session: String,
    pub hemisphere: Hemisphere,
    pub fwhm: String,
}

impl FilePatternQuery {
    /// Query matching every subject and session for one hemisphere.
    pub fn new(hemisphere: Hemisphere, fwhm: u32) -> Self {
        Self {
            subject: "sub-*".to_string(),
            session: "ses-*".to_string(),
            hemisphere,
            fwhm: fwhm.to_string(),
        }
    }

    /// Substitute every placeholder of `template`.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("@subject", &self.subject)
            .replace("@session", &self.session)
            .replace("@hemi", self.hemisphere.code())
            .replace("@fwhm", &self.fwhm)
    }

    /// Render `template` and return the part after `sub-*/ses-*/`.
    pub fn relative_pattern(&self, template: &str) -> Result<String> {
        let rendered = self.render(template);
        let start = rendered
            .find(SUBJECT_SESSION_PREFIX)
            .ok_or_else(|| CohortError::InvalidPattern {
                pattern: template.to_string(),
                reason: format!("expected it to contain {SUBJECT_SESSION_PREFIX} once rendered"),
            })?;
        let relative = &rendered[start + SUBJECT_SESSION_PREFIX.len()..];
        if relative.is_empty() {
            return Err(CohortError::InvalidPattern {
                pattern: template.to_string(),
                reason: "nothing left after the subject/session directories".to_string(),
            });
        }
        Ok(relative.to_string())
    }
}

/// A relative glob plus a human readable description for error reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputQuery {
    pub pattern: String,
    pub description: String,
}

/// Left and right hemisphere queries for surface features at `fwhm`.
pub fn surface_queries(template: &str, fwhm: u32) -> Result<Vec<InputQuery>> {
    Hemisphere::ALL
        .into_iter()
        .map(|hemisphere| {
            let query = FilePatternQuery::new(hemisphere, fwhm);
            Ok(InputQuery {
                pattern: query.relative_pattern(template)?,
                description: format!(
                    "surface-based features on {} hemisphere at FWHM = {}",
                    hemisphere.direction(),
                    query.fwhm
                ),
            })
        })
        .collect()
}
