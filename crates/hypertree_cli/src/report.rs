//! JSON report: per-step timings, the final summary and a leaf dump.

use anyhow::{Context, Result};
use hypertree::{Forest, ForestSummary};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of one pipeline step.
#[derive(Debug, Serialize)]
pub struct StepRecord {
	pub op: &'static str,
	/// Cells split (refine, uniform, balance) or collapsed (coarsen, sweep).
	pub changed: usize,
	pub leaves: usize,
	pub elapsed_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct SummaryRecord {
	pub trees: usize,
	pub leaves: usize,
	pub cells: usize,
	pub depth: u32,
	pub leaves_per_level: Vec<usize>,
}

impl From<&ForestSummary> for SummaryRecord {
	fn from(summary: &ForestSummary) -> Self {
		Self {
			trees: summary.tree_count,
			leaves: summary.leaf_count,
			cells: summary.cell_count,
			depth: summary.depth,
			leaves_per_level: summary.leaves_per_level.clone(),
		}
	}
}

/// One leaf with its placement and every attribute value.
#[derive(Debug, Serialize)]
pub struct LeafRecord {
	pub tree: usize,
	pub level: u32,
	pub coord: [u32; 3],
	pub min: [f64; 3],
	pub max: [f64; 3],
	pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct Report {
	pub steps: Vec<StepRecord>,
	pub summary: SummaryRecord,
	pub leaves: Vec<LeafRecord>,
}

impl Report {
	/// Build the report from the final forest.
	pub fn new(forest: &Forest, steps: Vec<StepRecord>) -> Result<Self> {
		let mut leaves = Vec::with_capacity(forest.leaf_count());
		for leaf in forest.leaves() {
			let bounds = forest
				.cell_bounds(leaf.tree, leaf.slot)
				.with_context(|| format!("Leaf {}:{} has no bounds", leaf.tree, leaf.slot))?;
			let tree = &forest.trees()[leaf.tree];
			let mut values = BTreeMap::new();
			for name in tree.attributes().names() {
				values.insert(name.to_owned(), tree.value(name, leaf.slot)?);
			}
			leaves.push(LeafRecord {
				tree: leaf.tree,
				level: leaf.level,
				coord: leaf.coord.axes(),
				min: bounds.min.to_array(),
				max: bounds.max.to_array(),
				values,
			});
		}
		Ok(Self {
			steps,
			summary: SummaryRecord::from(&forest.summary()),
			leaves,
		})
	}

	pub fn write(&self, path: &Path) -> Result<()> {
		let file = std::fs::File::create(path)
			.with_context(|| format!("Failed to create output file: {}", path.display()))?;
		serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)
			.with_context(|| format!("Failed to write report: {}", path.display()))?;
		Ok(())
	}
}
