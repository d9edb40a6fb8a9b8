//! Test-only helpers for building BIDS/CAPS trees and scripted collaborators.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use crate::core::pattern::Hemisphere;
use crate::pipelines::statistics_surface::{ModelRequest, SurfaceModel};

/// A dataset root in a temporary directory, removed on drop.
pub struct TestDataset {
    dir: TempDir,
}

impl TestDataset {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create `root/<subject>/<session>/`.
    pub fn add_bids_session(&self, subject: &str, session: &str) -> io::Result<PathBuf> {
        self.mkdir(&format!("{subject}/{session}"))
    }

    /// Create `root/subjects/<subject>/<session>/`.
    pub fn add_caps_session(&self, subject: &str, session: &str) -> io::Result<PathBuf> {
        self.mkdir(&format!("subjects/{subject}/{session}"))
    }

    /// Create the `CAPS/groups/group-<label>` folder.
    pub fn add_group(&self, label: &str) -> io::Result<PathBuf> {
        self.mkdir(&format!("groups/group-{label}"))
    }

    /// Create FreeSurfer thickness maps for the given hemispheres.
    pub fn add_thickness_files(
        &self,
        subject: &str,
        session: &str,
        fwhm: u32,
        hemispheres: &[Hemisphere],
    ) -> io::Result<Vec<PathBuf>> {
        hemispheres
            .iter()
            .map(|hemi| {
                self.touch(&format!(
                    "subjects/{subject}/{session}/t1/freesurfer_cross_sectional/{subject}_{session}/surf/{}.thickness.fwhm{fwhm}.fsaverage.mgh",
                    hemi.code()
                ))
            })
            .collect()
    }

    /// Create a DARTEL gray matter probability map for `group-<label>`.
    pub fn add_gray_matter_map(
        &self,
        subject: &str,
        session: &str,
        label: &str,
        modulated: bool,
    ) -> io::Result<PathBuf> {
        let modulated = if modulated { "on" } else { "off" };
        self.touch(&format!(
            "subjects/{subject}/{session}/t1/spm/dartel/group-{label}/{subject}_{session}_T1w_segm-graymatter_space-Ixi549Space_modulated-{modulated}_probability.nii.gz"
        ))
    }

    /// Write a participant table at `rel`.
    pub fn write_table(&self, rel: &str, pairs: &[(&str, &str)]) -> io::Result<PathBuf> {
        let mut contents = String::from("participant_id\tsession_id\n");
        for (subject, session) in pairs {
            contents.push_str(&format!("{subject}\t{session}\n"));
        }
        self.write(rel, &contents)
    }

    /// Create an empty file at `rel`, with parent directories.
    pub fn touch(&self, rel: &str) -> io::Result<PathBuf> {
        self.write(rel, "")
    }

    pub fn write(&self, rel: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    fn mkdir(&self, rel: &str) -> io::Result<PathBuf> {
        let path = self.root().join(rel);
        fs::create_dir_all(&path)?;
        Ok(path)
    }
}

/// Surface model that records requests and writes nothing but its output dir.
#[derive(Default)]
pub struct CapturingModel {
    pub last_request: RefCell<Option<ModelRequest>>,
}

impl SurfaceModel for CapturingModel {
    fn fit(&self, request: &ModelRequest) -> Result<PathBuf> {
        *self.last_request.borrow_mut() = Some(request.clone());
        let output_dir = request.working_dir.join("output");
        fs::create_dir_all(&output_dir)?;
        Ok(output_dir)
    }
}
