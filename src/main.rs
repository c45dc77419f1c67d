use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use mimic_features::utils::logging::{create_spinner, finish_spinner, print_table};
use mimic_features::{
    ClinicalSource, ExtractorConfig, ExtremumMode, FeatureExtractor, Hours, InMemorySource,
    PgSource, RankMode, RecordBatch, restrict_to_cohort, summarize,
};

/// Extract per-stay feature tables from a MIMIC-IV database
#[derive(Parser, Debug)]
#[command(name = "mimic-features")]
#[command(author, version, about)]
struct Cli {
    /// JSON configuration file; `MIMIC_*` environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read tables from a JSON fixture instead of the database
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Keep only stays in the cohort for this many hours
    #[arg(long, global = true, value_name = "HOURS")]
    restrict_to_cohort: Option<Hours>,

    /// Print at most this many rows
    #[arg(long, global = true, default_value_t = 20)]
    limit: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Demographics, height, weight, BMI and service flags
    Static,

    /// First or last lab values around ICU admission
    Labs {
        #[arg(long, default_value = "first")]
        mode: RankMode,
        /// Hours after ICU admission
        #[arg(long)]
        duration: Option<Hours>,
        /// Hours before ICU admission
        #[arg(long)]
        lookback: Option<Hours>,
    },

    /// First or last vital signs after ICU admission
    Vitals {
        #[arg(long, default_value = "first")]
        mode: RankMode,
        #[arg(long)]
        duration: Option<Hours>,
    },

    /// Minimum or maximum vital signs after ICU admission
    VitalsMinmax {
        #[arg(long, default_value = "min")]
        mode: ExtremumMode,
        #[arg(long)]
        duration: Option<Hours>,
    },

    /// In-hospital mortality flag
    Mortality,

    /// Stay ids of the study cohort
    Cohort {
        #[arg(long)]
        duration: Option<Hours>,
    },
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Self::Static => "static features",
            Self::Labs { .. } => "lab features",
            Self::Vitals { .. } => "vital features",
            Self::VitalsMinmax { .. } => "min/max vital features",
            Self::Mortality => "mortality",
            Self::Cohort { .. } => "cohort",
        }
    }
}

fn build<S: ClinicalSource + ?Sized>(
    extractor: &mut FeatureExtractor<'_, S>,
    command: &Command,
) -> mimic_features::Result<RecordBatch> {
    let defaults = extractor.defaults();
    match command {
        Command::Static => extractor.static_features(),
        Command::Labs {
            mode,
            duration,
            lookback,
        } => extractor.lab_features(
            *mode,
            duration.unwrap_or(defaults.duration_hours),
            lookback.unwrap_or(defaults.lab_lookback_hours),
        ),
        Command::Vitals { mode, duration } => {
            extractor.vitals_features(*mode, duration.unwrap_or(defaults.duration_hours))
        }
        Command::VitalsMinmax { mode, duration } => {
            extractor.min_max_vitals_features(*mode, duration.unwrap_or(defaults.duration_hours))
        }
        Command::Mortality => extractor.inhospital_mortality(),
        Command::Cohort { duration } => {
            extractor.filtered_cohort(duration.unwrap_or(defaults.duration_hours))
        }
    }
}

/// Build the requested table, optionally restricted to the cohort
fn run<S: ClinicalSource>(
    source: &mut S,
    cli: &Cli,
    config: &ExtractorConfig,
) -> anyhow::Result<RecordBatch> {
    let mut extractor = FeatureExtractor::with_config(source, config);

    let spinner = create_spinner(Some(&format!("Building {}", cli.command.label())));
    let table = build(&mut extractor, &cli.command)
        .with_context(|| format!("Failed to build {}", cli.command.label()))
        .and_then(|batch| match cli.restrict_to_cohort {
            Some(hours) => extractor
                .filtered_cohort(hours)
                .and_then(|cohort| restrict_to_cohort(&batch, &cohort))
                .with_context(|| format!("Failed to restrict to the {hours} cohort")),
            None => Ok(batch),
        });
    finish_spinner(&spinner, None);
    table
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ExtractorConfig::from_json_file(path)?.with_env_overrides()?,
        None => ExtractorConfig::from_env()?,
    };
    log::debug!("{config}");

    let start = Instant::now();
    let table = match &cli.fixture {
        Some(path) => {
            info!("Reading fixture tables from {}", path.display());
            let mut source = InMemorySource::from_json_file(path)?;
            run(&mut source, &cli, &config)?
        }
        None => {
            let mut source =
                PgSource::connect(&config.database).context("Failed to connect to the database")?;
            let table = run(&mut source, &cli, &config);
            source
                .close()
                .context("Failed to close the database connection")?;
            table?
        }
    };

    print_table(&table, Some(cli.limit))?;
    println!("{}", summarize(&table));
    info!("Done in {:?}", start.elapsed());

    Ok(())
}
