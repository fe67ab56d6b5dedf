//! Error codes shared by all memory operations.

use thiserror_no_std::Error;

/// Memory subsystem error codes.
///
/// The identifiers are stable: logs and tests match on them by name.
/// Argument-check variants (`NullPtr`, `Invalid*`) indicate programmer bugs
/// and are reported without side effects; the exhaustion variants
/// (`SegOvf`, `PoolEmpty`, `PoolFull`) are recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemError {
    /// A required reference was absent (null block address).
    #[error("null pointer argument")]
    NullPtr,
    /// Alignment is not a power of two.
    #[error("invalid memory alignment")]
    InvalidMemAlign,
    /// Size is zero or the request overflows the address space.
    #[error("invalid memory size")]
    InvalidMemSize,
    /// Segment size is zero or `base + size` overflows.
    #[error("invalid segment size")]
    InvalidSegSize,
    /// New segment overlaps an already registered one.
    #[error("segment overlaps an existing segment")]
    InvalidSegOverlap,
    /// New segment is exactly equal to an already registered one.
    #[error("segment already exists")]
    InvalidSegExists,
    /// The segment list is out of slots.
    #[error("segment list full")]
    SegListFull,
    /// Allocation exceeds the segment's remaining space.
    #[error("segment overflow")]
    SegOvf,
    /// Heap-side bookkeeping space exhausted (allocation tracking records).
    #[error("heap overflow")]
    HeapOvf,
    /// Pool block alignment is not a power of two.
    #[error("invalid block alignment")]
    InvalidBlkAlign,
    /// Pool block size is zero.
    #[error("invalid block size")]
    InvalidBlkSize,
    /// Pool block count is zero or initial count exceeds the maximum.
    #[error("invalid block count")]
    InvalidBlkNbr,
    /// Freed address does not belong to the pool's block grid.
    #[error("invalid block address")]
    InvalidBlkAddr,
    /// Freed address is already present in the pool's free table.
    #[error("block already in pool")]
    InvalidBlkAddrInPool,
    /// No blocks left to hand out.
    #[error("pool empty")]
    PoolEmpty,
    /// Every block is already back in the pool.
    #[error("pool full")]
    PoolFull,
    /// The pool has no block limit, so the query has no answer.
    #[error("pool is unlimited")]
    PoolUnlimited,
    /// Operation not supported in this build configuration.
    #[error("operation not supported")]
    Unsup,
}
