//! Balance enforcer - restores the 2:1 level invariant across neighbors.
//!
//! Each pass snapshots every leaf and compares it against the finest leaves
//! across each stencil offset. A leaf whose neighbor is more than
//! `max_relative_level` levels finer is subdivided once. The coarser side is
//! always the one refined, never the finer side collapsed: the cell count only
//! grows and no leaf is pushed past the deepest existing level, so the loop
//! reaches a pass with no subdivision.

use log::{debug, warn};
use smallvec::SmallVec;

use crate::error::{HyperTreeError, Result};
use crate::forest::Forest;
use crate::neighbors::{NeighborStencil, Offset};

/// Configuration of the balance fixpoint loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceConfig {
	/// Which neighbors are compared.
	pub stencil: NeighborStencil,
	/// Maximum level difference between adjacent leaves (1 = 2:1 balance).
	/// Set to 0 to disable enforcement.
	pub max_relative_level: u32,
	/// Pass limit. Hitting it is reported as `BalanceDidNotConverge`.
	pub max_passes: usize,
}

impl BalanceConfig {
	/// Face neighbors, 2:1, generous pass limit.
	pub const DEFAULT: Self = Self {
		stencil: NeighborStencil::VonNeumann,
		max_relative_level: 1,
		max_passes: 64,
	};

	/// Face, edge and corner neighbors, 2:1.
	pub const MOORE: Self = Self {
		stencil: NeighborStencil::Moore,
		max_relative_level: 1,
		max_passes: 64,
	};

	/// Check if enforcement is enabled.
	#[inline]
	pub fn enforcement_enabled(&self) -> bool {
		self.max_relative_level > 0
	}
}

impl Default for BalanceConfig {
	fn default() -> Self {
		Self::DEFAULT
	}
}

/// Statistics from a balance run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceStats {
	/// Passes executed, including the final pass that changed nothing.
	pub passes: usize,
	/// Leaves subdivided to restore the invariant.
	pub subdivisions: usize,
}

impl Forest {
	/// Refine leaves until no two neighbors differ by more than
	/// `max_relative_level` levels.
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "forest::balance"))]
	pub fn balance(&mut self, config: &BalanceConfig) -> Result<BalanceStats> {
		let mut stats = BalanceStats::default();
		if !config.enforcement_enabled() {
			return Ok(stats);
		}
		let offsets = config.stencil.offsets(self.config().dimension);

		for pass in 1..=config.max_passes {
			#[cfg(feature = "tracing")]
			let _span = tracing::info_span!("balance_pass", pass).entered();

			// Subdivision only appends slots, so snapshot slots stay valid.
			let snapshot: Vec<(usize, usize)> = self.leaves().map(|leaf| (leaf.tree, leaf.slot)).collect();
			let mut refined = 0;
			for (tree, slot) in snapshot {
				if self.too_coarse(tree, slot, &offsets, config.max_relative_level) {
					self.trees_mut()[tree].cursor_at(slot)?.subdivide_leaf()?;
					refined += 1;
				}
			}

			stats.passes = pass;
			stats.subdivisions += refined;
			debug!("balance pass {pass}: {refined} subdivisions");
			if refined == 0 {
				return Ok(stats);
			}
		}

		warn!(
			"balance did not converge in {} passes ({} subdivisions)",
			config.max_passes, stats.subdivisions
		);
		Err(HyperTreeError::BalanceDidNotConverge {
			passes: config.max_passes,
		})
	}

	/// True when no leaf has a neighbor more than one level finer.
	pub fn is_balanced(&self, stencil: NeighborStencil) -> bool {
		let offsets = stencil.offsets(self.config().dimension);
		self
			.leaves()
			.all(|leaf| !self.too_coarse(leaf.tree, leaf.slot, &offsets, 1))
	}

	fn too_coarse(
		&self,
		tree: usize,
		slot: usize,
		offsets: &SmallVec<[Offset; 26]>,
		max_relative_level: u32,
	) -> bool {
		let Some(level) = self.tree(tree).and_then(|t| t.cell(slot)).map(|c| c.level()) else {
			return false;
		};
		offsets.iter().any(|&offset| {
			self
				.finest_level_across(tree, slot, offset)
				.is_some_and(|finest| finest > level + max_relative_level)
		})
	}
}

#[cfg(test)]
#[path = "balance_test.rs"]
mod balance_test;
