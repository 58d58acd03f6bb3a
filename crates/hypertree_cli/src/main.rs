//! Hypertree grid pipeline runner.
//!
//! Builds a forest from the coarse grid described in a TOML file, applies the
//! configured refine / coarsen / balance steps in order and prints a summary.
//! With `--output`, writes a JSON report containing every leaf.

mod config;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use hypertree::{
	coarsen_forest, coarsen_sweep_forest, refine_forest, refine_uniform_forest, AboveThreshold,
	Always, BalanceConfig, Forest,
};
use log::info;
use std::path::PathBuf;
use web_time::Instant;

use config::{Config, StepConfig};
use report::{Report, StepRecord};

/// Adaptive forest-of-trees grid pipeline.
#[derive(Parser, Debug)]
#[command(name = "htg")]
#[command(about = "Refines, coarsens and balances a hypertree grid")]
struct Args {
	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: PathBuf,

	/// Write a JSON report with every leaf to this path.
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Worker threads for parallel steps (default: rayon's choice).
	#[arg(short, long)]
	threads: Option<usize>,
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	if let Some(threads) = args.threads {
		rayon::ThreadPoolBuilder::new()
			.num_threads(threads)
			.build_global()
			.context("Failed to configure the rayon thread pool")?;
	}

	info!("Loading config from: {}", args.config.display());
	let config = Config::load(&args.config)?;

	let mut forest = Forest::from_source(&config.source_grid(), config.forest_config())
		.context("Failed to build the forest")?;
	info!(
		"Built {} trees, B={}, D={}",
		forest.tree_count(),
		config.grid.branch_factor,
		config.grid.dimension
	);

	let mut steps = Vec::with_capacity(config.steps.len());
	for (index, step) in config.steps.iter().enumerate() {
		let start = Instant::now();
		let changed = run_step(&mut forest, step, config.parallel)
			.with_context(|| format!("Step {} ({}) failed", index + 1, step.label()))?;
		let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
		info!(
			"  {} #{}: {} changed, {} leaves ({:.2} ms)",
			step.label(),
			index + 1,
			changed,
			forest.leaf_count(),
			elapsed_ms
		);
		steps.push(StepRecord {
			op: step.label(),
			changed,
			leaves: forest.leaf_count(),
			elapsed_ms,
		});
	}

	forest.validate().context("Forest failed validation")?;
	print!("{}", forest.summary());

	if let Some(output) = &args.output {
		Report::new(&forest, steps)?.write(output)?;
		info!("Report written to: {}", output.display());
	}

	Ok(())
}

/// Apply one step. Returns the number of cells split or collapsed.
fn run_step(forest: &mut Forest, step: &StepConfig, parallel: bool) -> Result<usize> {
	let changed = match step {
		StepConfig::Refine {
			attribute,
			threshold,
			depth,
		} => {
			let stats = match (threshold, parallel) {
				(Some(t), true) => refine_forest(forest, attribute, *depth, &AboveThreshold(*t))?.0,
				(Some(t), false) => forest.refine(attribute, *depth, &AboveThreshold(*t))?,
				(None, true) => refine_forest(forest, attribute, *depth, &Always)?.0,
				(None, false) => forest.refine(attribute, *depth, &Always)?,
			};
			stats.subdivisions
		}
		StepConfig::Uniform { depth } => {
			let stats = if parallel {
				refine_uniform_forest(forest, *depth)?.0
			} else {
				forest.refine_uniform(*depth)?
			};
			stats.subdivisions
		}
		StepConfig::Coarsen {
			attribute,
			depth,
			merge,
		} => {
			let rule = merge.rule();
			let stats = if parallel {
				coarsen_forest(forest, attribute, *depth, &rule, merge.policy())?.0
			} else {
				forest.coarsen(attribute, *depth, &rule, merge.policy())?
			};
			stats.collapses
		}
		StepConfig::Sweep { attribute, merge } => {
			let rule = merge.rule();
			let stats = if parallel {
				coarsen_sweep_forest(forest, attribute, &rule, merge.policy())?.0
			} else {
				forest.coarsen_sweep(attribute, &rule, merge.policy())?
			};
			stats.collapses
		}
		StepConfig::Balance {
			stencil,
			max_passes,
		} => {
			let balance = BalanceConfig {
				stencil: stencil.stencil(),
				max_passes: *max_passes,
				..BalanceConfig::DEFAULT
			};
			forest.balance(&balance)?.subdivisions
		}
	};
	Ok(changed)
}
