use thiserror::Error;

/// Errors raised by the identifier allocators.
///
/// Exhausting a slot namespace is not an error: `alloc` returns `None` and
/// the caller decides what to do.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("Node ID allocator user id {user} exceeds the maximum of {max}.")]
    UserIdOutOfRange { user: u32, max: u32 },

    #[error("Free list for size class {size_class} is corrupt: {reason}")]
    FreeListCorrupt { size_class: u32, reason: String },
}
