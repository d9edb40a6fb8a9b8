//! `cohort` command-line driver.
//!
//! Discovers subject/session lists, checks pipeline parameters and resolves
//! group pipeline inputs. Results go to stdout (TSV or JSON); diagnostics go
//! to stderr through `RUST_LOG`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use cohort::core::aggregate::group_by_subject;
use cohort::core::ident::subjects_sessions_from_filenames;
use cohort::core::params::{check_parcellation_parameters, check_surface_parameters};
use cohort::core::types::Cohort;
use cohort::error::CohortError;
use cohort::exit_codes;
use cohort::io::config::{load_config, write_config};
use cohort::io::crash_log::crash_files;
use cohort::io::discover::{DatasetLayout, DiscoverOptions, discover, locate_table};
use cohort::io::table::read_table;
use cohort::logging;
use cohort::pipelines::statistics_surface::StatisticsSurface;
use cohort::pipelines::volume_parcellation::VolumeParcellation;
use cohort::pipelines::{GroupContext, Pipeline, WorkflowStep};

#[derive(Parser)]
#[command(
    name = "cohort",
    version,
    about = "Cohort resolution and parameter checks for BIDS/CAPS group studies"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the subject/session pairs of a dataset as a participant table.
    Discover {
        root: PathBuf,
        /// Scan `root/subjects` (CAPS) instead of `root` (BIDS).
        #[arg(long)]
        caps: bool,
        /// Read this participant table instead of scanning.
        #[arg(long)]
        table: Option<PathBuf>,
        /// List sessions from each `sub-X/sub-X_sessions.tsv`.
        #[arg(long)]
        use_session_tables: bool,
        /// Directory receiving the scanned table.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Group the sessions of a participant table by subject (JSON).
    Group { table: PathBuf },
    /// Extract subject/session pairs from file paths.
    Ids {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Normalize and validate pipeline parameters from a TOML config (JSON).
    Check {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, value_enum)]
        pipeline: PipelineKind,
        /// Write the normalized parameters back to the config file.
        #[arg(long)]
        write_back: bool,
    },
    /// Resolve statistics-surface inputs for a group (JSON).
    SurfaceInputs(GroupArgs),
    /// Resolve t1-volume-parcellation inputs for a group (JSON).
    ParcellationInputs(GroupArgs),
    /// List crash files reported in a workflow log.
    CrashFiles { log: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum PipelineKind {
    StatisticsSurface,
    T1VolumeParcellation,
}

#[derive(clap::Args)]
struct GroupArgs {
    caps_dir: PathBuf,
    #[arg(long)]
    group_label: String,
    #[arg(long)]
    config: PathBuf,
    /// Participant table; the CAPS `subjects` folder is scanned when unset.
    #[arg(long)]
    table: Option<PathBuf>,
    /// Working directory root.
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CohortError>() {
        Some(CohortError::MissingFiles(_)) => exit_codes::MISSING_FILES,
        _ => exit_codes::INVALID,
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Discover {
            root,
            caps,
            table,
            use_session_tables,
            cache_dir,
        } => {
            let options = DiscoverOptions {
                table,
                layout: if caps {
                    DatasetLayout::Caps
                } else {
                    DatasetLayout::Bids
                },
                use_session_tables,
                cache_dir,
            };
            let cohort = discover(&root, &options)?;
            print_table(&cohort);
            Ok(())
        }
        Command::Group { table } => {
            let cohort = read_table(&table)?;
            print_json(&group_by_subject(&cohort))
        }
        Command::Ids { paths } => {
            let (subjects, sessions) = subjects_sessions_from_filenames(&paths)?;
            print_table(&Cohort::new(subjects, sessions)?);
            Ok(())
        }
        Command::Check {
            config,
            pipeline,
            write_back,
        } => cmd_check(&config, pipeline, write_back),
        Command::SurfaceInputs(args) => {
            let mut cfg = load_config(&args.config)?;
            let context = group_context(&args)?;
            let pipeline = StatisticsSurface::new(context, &mut cfg.statistics_surface)?;
            let inputs = pipeline.build_inputs()?;
            print_json(&PipelineReport {
                name: pipeline.name(),
                participant_table: &pipeline.context().tsv_file,
                input_fields: pipeline.input_fields(),
                output_fields: pipeline.output_fields(),
                steps: pipeline.core_steps(),
                inputs,
            })
        }
        Command::ParcellationInputs(args) => {
            let mut cfg = load_config(&args.config)?;
            let context = group_context(&args)?;
            let pipeline = VolumeParcellation::new(context, &mut cfg.volume_parcellation)?;
            let inputs = pipeline.build_inputs()?;
            print_json(&PipelineReport {
                name: pipeline.name(),
                participant_table: &pipeline.context().tsv_file,
                input_fields: pipeline.input_fields(),
                output_fields: pipeline.output_fields(),
                steps: pipeline.core_steps(),
                inputs,
            })
        }
        Command::CrashFiles { log } => {
            for file in crash_files(&log)? {
                println!("{file}");
            }
            Ok(())
        }
    }
}

fn cmd_check(config: &Path, pipeline: PipelineKind, write_back: bool) -> Result<()> {
    let mut cfg = load_config(config)?;
    match pipeline {
        PipelineKind::StatisticsSurface => {
            let settings = check_surface_parameters(&mut cfg.statistics_surface)
                .context("invalid statistics_surface parameters")?;
            print_json(&settings)?;
        }
        PipelineKind::T1VolumeParcellation => {
            let settings = check_parcellation_parameters(&mut cfg.volume_parcellation)
                .context("invalid volume_parcellation parameters")?;
            print_json(&settings)?;
        }
    }
    if write_back {
        write_config(config, &cfg)?;
    }
    Ok(())
}

fn group_context(args: &GroupArgs) -> Result<GroupContext> {
    let options = DiscoverOptions {
        table: args.table.clone(),
        layout: DatasetLayout::Caps,
        ..DiscoverOptions::default()
    };
    let located = locate_table(&args.caps_dir, &options)
        .with_context(|| format!("list images of {}", args.caps_dir.display()))?;
    Ok(GroupContext {
        caps_dir: args.caps_dir.clone(),
        group_label: args.group_label.clone(),
        cohort: located.cohort,
        tsv_file: located.table,
        base_dir: args.base_dir.clone().unwrap_or_else(std::env::temp_dir),
    })
}

#[derive(Serialize)]
struct PipelineReport<'a, T> {
    name: &'static str,
    participant_table: &'a Path,
    input_fields: &'static [&'static str],
    output_fields: &'static [&'static str],
    steps: Vec<WorkflowStep>,
    inputs: T,
}

fn print_table(cohort: &Cohort) {
    println!("participant_id\tsession_id");
    for (subject, session) in cohort.pairs() {
        println!("{subject}\t{session}");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
