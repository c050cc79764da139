//! The typed entity model built from discovery output.
//!
//! [`transform`] turns a raw [`DiscoveryResult`](crate::discovery::DiscoveryResult)
//! into [`WorkspaceEntity`] values, [`build_forest`] arranges them for
//! presentation, and [`Provider`] indexes one snapshot for lookups.

pub mod entity;
pub mod kind;
pub mod provider;
pub mod transform;
pub mod tree;

pub use entity::WorkspaceEntity;
pub use kind::{Context, Kind, Unit};
pub use provider::{NameCollision, Provider};
pub use transform::transform;
pub use tree::{build_forest, flatten_depth_first, TreeNode};
