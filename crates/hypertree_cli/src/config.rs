//! Pipeline configuration parsing.

use anyhow::{Context, Result};
use glam::DVec3;
use hypertree::{
	AllBelow, AllIdentical, BalanceConfig, DAabb3, ForestConfig, MergePolicy, MergePredicate,
	NeighborStencil, SourceGrid, MAX_SUPPORTED_LEVEL,
};
use serde::Deserialize;
use std::path::Path;

/// Root configuration of a pipeline run.
#[derive(Debug, Deserialize)]
pub struct Config {
	/// Coarse grid the forest is built from.
	pub grid: GridConfig,
	/// Cell arrays attached to the coarse grid.
	#[serde(default)]
	pub arrays: Vec<ArrayConfig>,
	/// Shard every step except `balance` over rayon, one task per tree.
	#[serde(default)]
	pub parallel: bool,
	/// Operations applied in order.
	pub steps: Vec<StepConfig>,
}

/// Coarse grid and tree shape.
#[derive(Debug, Deserialize)]
pub struct GridConfig {
	/// Cells along x, y, z. Unused axes must be 1.
	pub cells: [usize; 3],
	/// Lower corner of the domain.
	#[serde(default)]
	pub min: [f64; 3],
	/// Upper corner of the domain.
	pub max: [f64; 3],
	#[serde(default = "default_branch_factor")]
	pub branch_factor: usize,
	#[serde(default = "default_dimension")]
	pub dimension: usize,
	#[serde(default = "default_max_level")]
	pub max_level: u32,
}

fn default_branch_factor() -> usize {
	2
}

fn default_dimension() -> usize {
	3
}

fn default_max_level() -> u32 {
	16
}

/// One source array. The variant is picked by which value field is present.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ArrayConfig {
	/// One explicit value per coarse cell.
	Explicit { name: String, values: Vec<f64> },
	/// `cell_index % modulo`.
	Modulo { name: String, modulo: usize },
	/// Same value everywhere.
	Constant { name: String, value: f64 },
}

/// A pipeline step.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepConfig {
	/// Refine cells whose value exceeds `threshold` (every cell if absent).
	Refine {
		attribute: String,
		threshold: Option<f64>,
		depth: u32,
	},
	/// Split every leaf `depth` times.
	Uniform { depth: u32 },
	/// Post-order coarsening with a depth budget.
	Coarsen {
		attribute: String,
		depth: u32,
		#[serde(flatten)]
		merge: MergeConfig,
	},
	/// Bottom-up coarsening until nothing merges.
	Sweep {
		attribute: String,
		#[serde(flatten)]
		merge: MergeConfig,
	},
	/// 2:1 balance.
	Balance {
		#[serde(default)]
		stencil: StencilName,
		#[serde(default = "default_max_passes")]
		max_passes: usize,
	},
}

fn default_max_passes() -> usize {
	BalanceConfig::DEFAULT.max_passes
}

/// Merge predicate and reduction of a coarsening step.
#[derive(Debug, Deserialize)]
pub struct MergeConfig {
	/// Merge when every child is below this value. Without it, children must
	/// be identical.
	pub below: Option<f64>,
	#[serde(default)]
	pub policy: PolicyName,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyName {
	#[default]
	Identical,
	Mean,
	First,
	Min,
	Max,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StencilName {
	#[default]
	VonNeumann,
	Moore,
}

/// Merge predicate chosen by a [`MergeConfig`].
pub enum MergeRule {
	Below(AllBelow),
	Identical(AllIdentical),
}

impl MergePredicate for MergeRule {
	fn should_merge(&self, children: &[f64], level: u32) -> bool {
		match self {
			MergeRule::Below(rule) => rule.should_merge(children, level),
			MergeRule::Identical(rule) => rule.should_merge(children, level),
		}
	}
}

impl MergeConfig {
	pub fn rule(&self) -> MergeRule {
		match self.below {
			Some(threshold) => MergeRule::Below(AllBelow(threshold)),
			None => MergeRule::Identical(AllIdentical),
		}
	}

	pub fn policy(&self) -> MergePolicy {
		match self.policy {
			PolicyName::Identical => MergePolicy::Identical,
			PolicyName::Mean => MergePolicy::Mean,
			PolicyName::First => MergePolicy::First,
			PolicyName::Min => MergePolicy::Min,
			PolicyName::Max => MergePolicy::Max,
		}
	}
}

impl StencilName {
	pub fn stencil(self) -> NeighborStencil {
		match self {
			StencilName::VonNeumann => NeighborStencil::VonNeumann,
			StencilName::Moore => NeighborStencil::Moore,
		}
	}
}

impl ArrayConfig {
	pub fn name(&self) -> &str {
		match self {
			ArrayConfig::Explicit { name, .. }
			| ArrayConfig::Modulo { name, .. }
			| ArrayConfig::Constant { name, .. } => name,
		}
	}
}

impl StepConfig {
	/// Short label for logs and reports.
	pub fn label(&self) -> &'static str {
		match self {
			StepConfig::Refine { .. } => "refine",
			StepConfig::Uniform { .. } => "uniform",
			StepConfig::Coarsen { .. } => "coarsen",
			StepConfig::Sweep { .. } => "sweep",
			StepConfig::Balance { .. } => "balance",
		}
	}
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and validate configuration TOML.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).with_context(|| "Failed to parse config TOML")?;

		if config.steps.is_empty() {
			anyhow::bail!("Config must have at least one step");
		}
		for axis in 0..3 {
			let (min, max) = (config.grid.min[axis], config.grid.max[axis]);
			if !min.is_finite() || !max.is_finite() {
				anyhow::bail!("Grid bounds must be finite on axis {axis}, got [{min}, {max}]");
			}
			if min > max {
				anyhow::bail!("Grid min {min} exceeds max {max} on axis {axis}");
			}
		}
		if config.grid.max_level > MAX_SUPPORTED_LEVEL {
			anyhow::bail!(
				"max_level must be at most {}, got {}",
				MAX_SUPPORTED_LEVEL,
				config.grid.max_level
			);
		}
		for array in &config.arrays {
			if let ArrayConfig::Modulo { name, modulo: 0 } = array {
				anyhow::bail!("Array `{name}` has modulo 0");
			}
		}
		for step in &config.steps {
			let attribute = match step {
				StepConfig::Refine { attribute, .. }
				| StepConfig::Coarsen { attribute, .. }
				| StepConfig::Sweep { attribute, .. } => attribute,
				_ => continue,
			};
			if !config.arrays.iter().any(|array| array.name() == attribute) {
				anyhow::bail!(
					"Step `{}` uses unknown array `{attribute}`",
					step.label()
				);
			}
		}

		Ok(config)
	}

	pub fn forest_config(&self) -> ForestConfig {
		ForestConfig::new(self.grid.branch_factor, self.grid.dimension)
			.with_max_level(self.grid.max_level)
	}

	/// Coarse grid with every configured array filled in.
	pub fn source_grid(&self) -> SourceGrid {
		let bounds = DAabb3::new(DVec3::from(self.grid.min), DVec3::from(self.grid.max));
		let mut source = SourceGrid::new(self.grid.cells, bounds);
		for array in &self.arrays {
			source = match array {
				ArrayConfig::Explicit { name, values } => source.with_array(name.clone(), values.clone()),
				ArrayConfig::Modulo { name, modulo } => {
					let modulo = *modulo;
					source.with_array_fn(name.clone(), move |i| (i % modulo) as f64)
				}
				ArrayConfig::Constant { name, value } => {
					let value = *value;
					source.with_array_fn(name.clone(), move |_| value)
				}
			};
		}
		source
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const PIPELINE: &str = r#"
parallel = true

[grid]
cells = [4, 4, 4]
max = [4.0, 4.0, 4.0]

[[arrays]]
name = "CellData"
modulo = 25

[[arrays]]
name = "Density"
value = 1.5

[[steps]]
op = "refine"
attribute = "CellData"
threshold = 10.0
depth = 3

[[steps]]
op = "coarsen"
attribute = "CellData"
depth = 3
below = 12.0
policy = "mean"

[[steps]]
op = "balance"
stencil = "moore"
"#;

	#[test]
	fn test_parse_pipeline() {
		let config = Config::parse(PIPELINE).unwrap();
		assert!(config.parallel);
		assert_eq!(config.grid.cells, [4, 4, 4]);
		assert_eq!(config.grid.min, [0.0; 3]);
		assert_eq!(config.forest_config(), ForestConfig::default());
		assert_eq!(config.arrays.len(), 2);
		assert!(matches!(config.arrays[0], ArrayConfig::Modulo { modulo: 25, .. }));
		assert!(matches!(config.arrays[1], ArrayConfig::Constant { .. }));

		let labels: Vec<_> = config.steps.iter().map(StepConfig::label).collect();
		assert_eq!(labels, ["refine", "coarsen", "balance"]);
		match &config.steps[1] {
			StepConfig::Coarsen { merge, .. } => {
				assert_eq!(merge.policy(), MergePolicy::Mean);
				assert!(matches!(merge.rule(), MergeRule::Below(_)));
			}
			other => panic!("unexpected step {other:?}"),
		}
		match &config.steps[2] {
			StepConfig::Balance { stencil, max_passes } => {
				assert_eq!(stencil.stencil(), NeighborStencil::Moore);
				assert_eq!(*max_passes, 64);
			}
			other => panic!("unexpected step {other:?}"),
		}
	}

	#[test]
	fn test_shipped_pipeline_parses() {
		let config = Config::parse(include_str!("../pipeline.toml")).unwrap();
		assert_eq!(config.forest_config().max_level, 8);
		assert_eq!(config.steps.len(), 3);
	}

	#[test]
	fn test_source_grid_generates_arrays() {
		let config = Config::parse(PIPELINE).unwrap();
		let source = config.source_grid();
		assert_eq!(source.cell_count(), 64);
		assert_eq!(source.arrays[0].values[30], 5.0);
		assert!(source.arrays[1].values.iter().all(|&v| v == 1.5));
	}

	#[test]
	fn test_rejects_unknown_attribute() {
		let content = PIPELINE.replace("attribute = \"CellData\"\ndepth = 3\nbelow", "attribute = \"Nope\"\ndepth = 3\nbelow");
		let err = Config::parse(&content).unwrap_err();
		assert!(err.to_string().contains("Nope"));
	}

	#[test]
	fn test_rejects_empty_steps() {
		let content = r#"
steps = []

[grid]
cells = [1, 1, 1]
max = [1.0, 1.0, 1.0]
"#;
		assert!(Config::parse(content).is_err());
	}

	#[test]
	fn test_rejects_inverted_bounds() {
		let content = r#"
[grid]
cells = [1, 1, 1]
min = [2.0, 0.0, 0.0]
max = [0.0, 1.0, 1.0]

[[steps]]
op = "uniform"
depth = 1
"#;
		let err = Config::parse(content).unwrap_err();
		assert!(err.to_string().contains("axis 0"));
	}

	#[test]
	fn test_rejects_non_finite_bounds() {
		let content = r#"
[grid]
cells = [1, 1, 1]
max = [inf, 1.0, 1.0]

[[steps]]
op = "uniform"
depth = 1
"#;
		assert!(Config::parse(content).is_err());
	}

	#[test]
	fn test_merge_defaults_to_identical() {
		let content = r#"
[grid]
cells = [2, 1, 1]
max = [2.0, 1.0, 1.0]

[[arrays]]
name = "v"
values = [1.0, 2.0]

[[steps]]
op = "sweep"
attribute = "v"
"#;
		let config = Config::parse(content).unwrap();
		match &config.steps[0] {
			StepConfig::Sweep { merge, .. } => {
				assert_eq!(merge.policy(), MergePolicy::Identical);
				assert!(matches!(merge.rule(), MergeRule::Identical(_)));
			}
			other => panic!("unexpected step {other:?}"),
		}
	}
}
