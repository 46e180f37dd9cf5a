//! # Cairn Grid - Two-Level Grid Index
//!
//! The bundled concrete flavor for the cairn spatial engine: one root index
//! node over fixed bounds, subdivided into per-axis tiles. Entries that fit
//! inside a single tile live in that tile; entries spanning tiles live on
//! the root. Tiles materialize lazily on first insert, and an insert
//! outside the bounds grows the grid over the combined extent.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cairn::{CollectingVisitor, MemoryStorage, Region, Shape, SpatialIndex};
//! use cairn_grid::GridIndex;
//!
//! let bounds = Region::new(vec![0.0, 0.0], vec![100.0, 100.0]);
//! let index: GridIndex<u64> = GridIndex::new(bounds, Box::new(MemoryStorage::new()))?;
//!
//! index.insert_data(1, Shape::from(Region::new(vec![2.0, 2.0], vec![3.0, 3.0])))?;
//!
//! let mut visitor = CollectingVisitor::new();
//! index.intersection_query(
//!     &Shape::from(Region::new(vec![0.0, 0.0], vec![10.0, 10.0])),
//!     &mut visitor,
//! )?;
//! index.flush()?;
//! ```

pub mod index;
pub mod node;

pub use index::{GridConfig, GridIndex};
pub use node::GridNode;
