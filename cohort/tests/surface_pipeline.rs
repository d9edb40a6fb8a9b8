//! End-to-end checks of the group pipelines through the CLI and the library.

use std::process::Command;

use cohort::core::params::DataCategory;
use cohort::core::pattern::Hemisphere;
use cohort::exit_codes;
use cohort::io::config::load_config;
use cohort::io::discover::{DatasetLayout, DiscoverOptions, discover};
use cohort::pipelines::GroupContext;
use cohort::pipelines::statistics_surface::StatisticsSurface;
use cohort::test_support::{CapturingModel, TestDataset};

const SURFACE_CONFIG: &str = "[statistics_surface]
orig_input_data = \"t1-freesurfer\"
contrast = \"group\"
glm_type = \"group_comparison\"
";

fn caps_with_thickness(missing_right: &[&str]) -> TestDataset {
    let dataset = TestDataset::new().expect("dataset");
    for subject in ["sub-01", "sub-02", "sub-03"] {
        let hemispheres: &[Hemisphere] = if missing_right.contains(&subject) {
            &[Hemisphere::Left]
        } else {
            &Hemisphere::ALL
        };
        dataset
            .add_thickness_files(subject, "ses-M00", 20, hemispheres)
            .expect("thickness files");
    }
    dataset
}

#[test]
fn surface_inputs_missing_file_exits_with_missing_code() {
    let dataset = caps_with_thickness(&["sub-02"]);
    let config = dataset.write("config.toml", SURFACE_CONFIG).expect("config");

    let output = Command::new(env!("CARGO_BIN_EXE_cohort"))
        .arg("surface-inputs")
        .arg(dataset.root())
        .args(["--group-label", "AD"])
        .arg("--config")
        .arg(&config)
        .output()
        .expect("cohort surface-inputs");

    assert_eq!(output.status.code(), Some(exit_codes::MISSING_FILES));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 input file(s) could not be resolved"));
    assert!(stderr.contains("sub-02 | ses-M00"));
}

#[test]
fn surface_inputs_reports_resolved_files() {
    let dataset = caps_with_thickness(&[]);
    let config = dataset.write("config.toml", SURFACE_CONFIG).expect("config");

    let output = Command::new(env!("CARGO_BIN_EXE_cohort"))
        .arg("surface-inputs")
        .arg(dataset.root())
        .args(["--group-label", "AD"])
        .arg("--config")
        .arg(&config)
        .output()
        .expect("cohort surface-inputs");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["name"], "statistics_surface");
    let table = report["participant_table"].as_str().expect("table path");
    assert!(table.contains("subjects_sessions_list_"));
    assert!(std::path::Path::new(table).is_file());
    assert_eq!(report["inputs"]["files"][0].as_array().map(Vec::len), Some(3));
    assert_eq!(report["inputs"]["files"][1].as_array().map(Vec::len), Some(3));
}

#[test]
fn existing_group_exits_with_invalid_code() {
    let dataset = caps_with_thickness(&[]);
    dataset.add_group("AD").expect("group");
    let config = dataset.write("config.toml", SURFACE_CONFIG).expect("config");

    let output = Command::new(env!("CARGO_BIN_EXE_cohort"))
        .arg("surface-inputs")
        .arg(dataset.root())
        .args(["--group-label", "AD"])
        .arg("--config")
        .arg(&config)
        .output()
        .expect("cohort surface-inputs");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("group already exists"));
}

#[test]
fn check_writes_normalized_parameters_back() {
    let dataset = TestDataset::new().expect("dataset");
    let config = dataset.write("config.toml", SURFACE_CONFIG).expect("config");

    let status = Command::new(env!("CARGO_BIN_EXE_cohort"))
        .arg("check")
        .arg("--config")
        .arg(&config)
        .args(["--pipeline", "statistics-surface", "--write-back"])
        .status()
        .expect("cohort check");

    assert_eq!(status.code(), Some(exit_codes::OK));
    let cfg = load_config(&config).expect("reload");
    assert_eq!(cfg.statistics_surface.full_width_at_half_maximum, Some(20));
    assert_eq!(cfg.statistics_surface.measure_label.as_deref(), Some("ct"));
}

#[test]
fn discovered_cohort_feeds_the_surface_model() {
    let dataset = caps_with_thickness(&[]);
    let table = dataset
        .write_table("participants.tsv", &[("sub-03", "ses-M00"), ("sub-01", "ses-M00")])
        .expect("table");
    let options = DiscoverOptions {
        table: Some(table.clone()),
        layout: DatasetLayout::Caps,
        ..DiscoverOptions::default()
    };
    let cohort = discover(dataset.root(), &options).expect("discover");

    let context = GroupContext {
        caps_dir: dataset.root().to_path_buf(),
        group_label: "HC".to_string(),
        cohort,
        tsv_file: table,
        base_dir: dataset.root().join("wd"),
    };
    let mut params = load_config(&dataset.root().join("absent.toml"))
        .expect("defaults")
        .statistics_surface;
    params.orig_input_data = Some(DataCategory::T1Freesurfer);
    params.contrast = Some("group".to_string());
    params.glm_type = Some("correlation".to_string());

    let pipeline = StatisticsSurface::new(context, &mut params).expect("pipeline");
    let model = CapturingModel::default();
    pipeline.run(&model).expect("run");

    let request = model.last_request.borrow().clone().expect("model called");
    assert_eq!(request.cohort.subjects(), ["sub-03", "sub-01"]);
    assert!(request.left_files[0].to_string_lossy().contains("sub-03_ses-M00"));
}
