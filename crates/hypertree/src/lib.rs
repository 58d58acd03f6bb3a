//! hypertree - Forest-of-trees adaptive grid engine
//!
//! A coarse structured grid is turned into a forest: every coarse cell roots a
//! tree whose cells split into `B^D` children (binary octrees, ternary
//! quadtrees, ...). Trees are refined, coarsened and 2:1 balanced through
//! pluggable predicates, with every named cell attribute kept in sync.
//!
//! # Features
//!
//! - **Compact storage**: one slot arena per tree, attributes stored as dense
//!   per-slot arrays
//! - **Cursor navigation**: move down, up and back to the root while reading
//!   and writing attributes, subdividing and collapsing leaves
//! - **Refinement / Coarsening**: top-down and bottom-up engines with a depth
//!   budget, driven by [`RefinePredicate`] / [`MergePredicate`]
//! - **2:1 Balance**: Von Neumann or Moore neighborhoods, across tree
//!   boundaries
//! - **Parallel drivers**: one rayon task per tree
//!
//! # Example
//!
//! ```ignore
//! use hypertree::{AboveThreshold, BalanceConfig, DAabb3, Forest, ForestConfig, SourceGrid};
//! use glam::DVec3;
//!
//! let source = SourceGrid::new([4, 4, 4], DAabb3::new(DVec3::ZERO, DVec3::splat(4.0)))
//!   .with_array_fn("CellData", |i| (i % 25) as f64);
//! let mut forest = Forest::from_source(&source, ForestConfig::default())?;
//!
//! forest.refine("CellData", 3, &AboveThreshold(10.0))?;
//! forest.balance(&BalanceConfig::DEFAULT)?;
//!
//! println!("{}", forest.summary());
//! ```

pub mod attributes;
pub mod balance;
pub mod bounds;
pub mod coarsening;
pub mod config;
pub mod cursor;
pub mod error;
pub mod forest;
pub mod neighbors;
pub mod parallel;
pub mod refinement;
pub mod source;
pub mod summary;
pub mod tree;

// Re-export commonly used items
pub use attributes::AttributeStore;
pub use balance::{BalanceConfig, BalanceStats};
pub use bounds::DAabb3;
pub use coarsening::{
  coarsen, coarsen_sweep, AllBelow, AllIdentical, CoarseningStats, MergePolicy, MergePredicate,
};
pub use config::{ForestConfig, MAX_SUPPORTED_LEVEL};
pub use cursor::Cursor;
pub use error::{HyperTreeError, Result};
pub use forest::{Forest, ForestGeometry, LeafRef};
pub use neighbors::{NeighborRef, NeighborStencil, Offset};
pub use parallel::{
  coarsen_forest, coarsen_sweep_forest, refine_forest, refine_uniform_forest, ShardTiming,
};
pub use refinement::{
  refine, refine_uniform, AboveThreshold, Always, BelowLevel, RefinePredicate, RefinementStats,
};
pub use source::{SourceArray, SourceGrid};
pub use summary::{AttributeRange, ForestSummary};
pub use tree::{Cell, CellCoord, Tree};
