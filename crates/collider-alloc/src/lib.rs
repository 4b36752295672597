//! Collider-Alloc: identifier allocation for a remote synthesis server.
//!
//! The server addresses its resources through small, bounded integer
//! namespaces. This crate hands out collision-free identifiers from them:
//!
//! - [`PowerOfTwoAllocator`]: contiguous slot runs (audio/control buses,
//!   sample buffers), rounded up to power-of-two size classes and recycled
//!   through per-class free lists.
//! - [`NodeIdAllocator`]: 32-bit node identifiers split into a temporary and
//!   a permanent range, prefixed with the client's user id.
//! - [`UniqueId`]: a plain monotonically increasing counter.
//!
//! # Thread Safety
//!
//! Every allocator guards its state with a single `parking_lot::Mutex`, so
//! operations on one instance are strictly serialized. Two instances share
//! nothing and are not ordered relative to each other.
//!
//! # Usage
//!
//! ```rust
//! use collider_alloc::{BlockAllocator, NodeIdAllocator, PowerOfTwoAllocator};
//!
//! let buses = PowerOfTwoAllocator::with_base(128, 16);
//! let bus = buses.alloc(2).expect("bus space left");
//! assert_eq!(bus, 16);
//! buses.free(bus);
//!
//! let nodes = NodeIdAllocator::new(0).unwrap();
//! assert_eq!(nodes.alloc(), 1000);
//! ```

mod block;
mod error;
mod node_id;
mod power_of_two;
mod unique;

pub use block::{size_class_of, Block, BlockAllocator, BlockAllocatorFactory, NUM_SIZE_CLASSES};
pub use error::AllocError;
pub use node_id::{NodeId, NodeIdAllocator};
pub use power_of_two::{PowerOfTwoAllocator, PowerOfTwoFactory};
pub use unique::UniqueId;
