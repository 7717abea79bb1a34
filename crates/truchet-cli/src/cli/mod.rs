//! CLI command implementations.
//!
//! - `tile` - generate a Truchet pattern from SVG symbols
//! - `join` - join touching paths of an existing SVG

pub mod common;
pub mod config;
pub mod join;
pub mod tile;

pub use join::{JoinArgs, cmd_join};
pub use tile::{TileArgs, cmd_tile};
