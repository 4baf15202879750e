//! Chain State Manager: block index, canonical tip, accumulated work,
//! fork choice, and reorganization. The single point through which all
//! block submissions and chain mutations are serialized.

pub mod index;
pub mod manager;

pub use index::{BlockIndexEntry, BlockStatus};
pub use manager::ChainStateManager;
