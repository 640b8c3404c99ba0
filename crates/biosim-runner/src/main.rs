//! Command line runner for island jobs.

mod telemetry;

use anyhow::{Context, Result};
use biosim_core::{SpeciesCounts, YearCounters, YearStats};
use biosim_world::IslandJob;
use clap::Parser;
use serde_json::json;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "biosim-runner")]
#[command(version)]
#[command(about = "Run an island ecosystem job and print one JSON report per year")]
struct Cli {
    /// Island job file (JSON)
    #[arg(short, long)]
    job: PathBuf,

    /// Override the job's random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Emit full per-year reports including weight, fitness and age samples
    #[arg(long)]
    full: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_logging(cli.log_json)?;

    let mut job = IslandJob::from_path(&cli.job)
        .with_context(|| format!("failed to load job {}", cli.job.display()))?;
    if let Some(seed) = cli.seed {
        job.config.seed = seed;
    }

    info!(
        job = %cli.job.display(),
        seed = job.config.seed,
        years = job.total_years(),
        "Running island job"
    );

    let result = job.execute().context("island job failed")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for stats in &result.years {
        if cli.full {
            serde_json::to_writer(&mut out, stats)?;
        } else {
            serde_json::to_writer(&mut out, &summary(stats))?;
        }
        writeln!(out)?;
    }
    out.flush()?;

    info!(
        final_year = result.final_year,
        herbivores = result.final_counts.herbivores,
        carnivores = result.final_counts.carnivores,
        "Job complete"
    );
    Ok(())
}

fn summary(stats: &YearStats) -> serde_json::Value {
    let YearCounters {
        births,
        prey_killed,
        emigrations,
        deaths,
    } = stats.counters;
    let SpeciesCounts {
        herbivores,
        carnivores,
    } = stats.end_of_year;

    json!({
        "year": stats.year,
        "herbivores": herbivores,
        "carnivores": carnivores,
        "total": herbivores + carnivores,
        "births": births,
        "prey_killed": prey_killed,
        "emigrations": emigrations,
        "deaths": deaths,
    })
}
