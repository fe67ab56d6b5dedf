//! Dynamic block pool with an intrusive free list.
//!
//! Freed blocks double as list nodes: the first pointer-sized word of a
//! free block holds the address of the next free block. A block therefore
//! belongs to exactly one owner at any time, the caller while live and
//! the pool while free, and callers must not expect the leading word to
//! survive a free/get cycle.

use core::cell::RefCell;
use core::mem::size_of;

use critical_section::Mutex;

use crate::{is_pow2, round_up, MemError, SegmentId, SegmentList, PADDING_NONE};

struct State {
    /// Head of the intrusive free list; zero when empty.
    head: usize,
    /// Blocks currently held by callers. Maintained only for limited pools.
    allocated: usize,
}

/// Lazily growing pool of equally sized blocks.
///
/// Starts with `qty_init` blocks threaded onto the free list and grows one
/// block at a time from the backing segment until the optional maximum is
/// reached. Growth happens inside `get`, never in interrupt handlers'
/// critical path beyond the segment's own critical section.
pub struct DynPool<'a> {
    list: &'a SegmentList,
    seg: SegmentId,
    name: Option<&'static str>,
    /// Grid stride: block size rounded up so every block can hold the
    /// free-list word and respects the worst-case alignment.
    blk_size: usize,
    blk_align: usize,
    padding_align: usize,
    /// `None` means unlimited.
    max: Option<usize>,
    state: Mutex<RefCell<State>>,
}

impl<'a> DynPool<'a> {
    /// Create a pool without padding between blocks.
    ///
    /// # Errors
    ///
    /// `InvalidBlkSize` / `InvalidBlkAlign` / `InvalidBlkNbr` for bad
    /// parameters, `Unsup` when the segment does not map real memory, plus
    /// any segment allocation error for the initial block grid.
    pub fn create(
        name: Option<&'static str>,
        list: &'a SegmentList,
        seg: SegmentId,
        blk_size: usize,
        blk_align: usize,
        qty_init: usize,
        max: Option<usize>,
    ) -> Result<Self, MemError> {
        Self::create_internal(name, list, seg, blk_size, blk_align, PADDING_NONE, qty_init, max)
    }

    /// Create a pool whose blocks are padded to the segment's stored
    /// padding alignment (the hardware-buffer form).
    ///
    /// # Errors
    ///
    /// Same as [`DynPool::create`].
    pub fn create_hw(
        name: Option<&'static str>,
        list: &'a SegmentList,
        seg: SegmentId,
        blk_size: usize,
        blk_align: usize,
        qty_init: usize,
        max: Option<usize>,
    ) -> Result<Self, MemError> {
        let padding = list.padding_of(seg)?;
        Self::create_internal(name, list, seg, blk_size, blk_align, padding, qty_init, max)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_internal(
        name: Option<&'static str>,
        list: &'a SegmentList,
        seg: SegmentId,
        blk_size: usize,
        blk_align: usize,
        padding_align: usize,
        qty_init: usize,
        max: Option<usize>,
    ) -> Result<Self, MemError> {
        if blk_size < 1 {
            return Err(MemError::InvalidBlkSize);
        }
        if !is_pow2(blk_align) {
            return Err(MemError::InvalidBlkAlign);
        }
        if let Some(limit) = max {
            if qty_init > limit {
                return Err(MemError::InvalidBlkNbr);
            }
        }
        // The free list lives inside the blocks, so the segment must map
        // real memory; a bare address-range segment cannot host this pool.
        if !list.is_backed(seg) {
            return Err(MemError::Unsup);
        }

        let ptr_size = size_of::<usize>();
        // Every block holds at least the free-list word, and the alignment
        // covers the caller's requirement, the padding and the pointer word.
        let eff_align = blk_align.max(padding_align).max(ptr_size);
        let eff_size = round_up(blk_size.max(ptr_size), eff_align);

        let mut head = 0usize;
        if qty_init > 0 {
            let grid_size = eff_size
                .checked_mul(qty_init)
                .ok_or(MemError::InvalidMemSize)?;
            let grid = list.alloc(seg, name, grid_size, eff_align, PADDING_NONE, None)?;

            // Thread the initial blocks front to back; the last one
            // terminates the list.
            head = grid;
            let mut blk = grid;
            for i in 0..qty_init {
                let next = if i + 1 < qty_init { blk + eff_size } else { 0 };
                // SAFETY: `blk` lies within the freshly allocated grid of a
                // memory-backed segment and `eff_size >= size_of::<usize>()`,
                // so the pointer word is in bounds and exclusively ours.
                unsafe { core::ptr::write(blk as *mut usize, next) };
                blk += eff_size;
            }
        }

        Ok(Self {
            list,
            seg,
            name,
            blk_size: eff_size,
            blk_align: eff_align,
            padding_align,
            max,
            state: Mutex::new(RefCell::new(State { head, allocated: 0 })),
        })
    }

    /// Take a block, growing the pool from its segment when the free list
    /// is dry.
    ///
    /// # Errors
    ///
    /// `PoolEmpty` when the limit is reached; otherwise any segment error
    /// from growing (the speculative count bump is rolled back).
    pub fn get(&self) -> Result<usize, MemError> {
        if let Some(limit) = self.max {
            let full = critical_section::with(|cs| {
                let mut st = self.state.borrow_ref_mut(cs);
                if st.allocated >= limit {
                    true
                } else {
                    st.allocated += 1;
                    false
                }
            });
            if full {
                return Err(MemError::PoolEmpty);
            }
        }

        let from_list = critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            if st.head == 0 {
                return None;
            }
            let blk = st.head;
            // SAFETY: `blk` is a block previously threaded onto the free
            // list, inside backed segment memory; while free, its leading
            // word is owned by the pool.
            st.head = unsafe { core::ptr::read(blk as *const usize) };
            Some(blk)
        });
        if let Some(blk) = from_list {
            return Ok(blk);
        }

        match self.list.alloc(
            self.seg,
            self.name,
            self.blk_size,
            self.blk_align,
            self.padding_align,
            None,
        ) {
            Ok(blk) => Ok(blk),
            Err(e) => {
                if self.max.is_some() {
                    critical_section::with(|cs| {
                        self.state.borrow_ref_mut(cs).allocated -= 1;
                    });
                }
                Err(e)
            }
        }
    }

    /// Push a block back onto the free list.
    ///
    /// The block's leading pointer word is overwritten.
    ///
    /// # Errors
    ///
    /// `NullPtr` for a zero address, `PoolFull` when a limited pool
    /// already has every block back.
    pub fn free(&self, block: usize) -> Result<(), MemError> {
        if block == 0 {
            return Err(MemError::NullPtr);
        }

        if self.max.is_some() {
            let none_out = critical_section::with(|cs| {
                let mut st = self.state.borrow_ref_mut(cs);
                if st.allocated == 0 {
                    true
                } else {
                    st.allocated -= 1;
                    false
                }
            });
            if none_out {
                return Err(MemError::PoolFull);
            }
        }

        critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            // SAFETY: the caller returns exclusive ownership of the block
            // with this call; the pool reclaims the leading word as the
            // free-list link.
            unsafe { core::ptr::write(block as *mut usize, st.head) };
            st.head = block;
        });

        Ok(())
    }

    /// Blocks still available before the limit is hit.
    ///
    /// # Errors
    ///
    /// `PoolUnlimited` when the pool was created without a maximum.
    pub fn remaining(&self) -> Result<usize, MemError> {
        match self.max {
            Some(limit) => Ok(critical_section::with(|cs| {
                limit - self.state.borrow_ref(cs).allocated
            })),
            None => Err(MemError::PoolUnlimited),
        }
    }

    /// Grid stride in bytes.
    pub fn block_size(&self) -> usize {
        self.blk_size
    }

    /// Walk the free list, bounded by `limit` hops.
    ///
    /// Returns the number of free blocks, or `None` if the walk did not
    /// terminate within `limit` (a corrupted, cyclic list).
    #[cfg(test)]
    fn free_list_len(&self, limit: usize) -> Option<usize> {
        critical_section::with(|cs| {
            let st = self.state.borrow_ref(cs);
            let mut cur = st.head;
            let mut n = 0;
            while cur != 0 {
                if n > limit {
                    return None;
                }
                // SAFETY: free blocks store a valid next link in their
                // leading word for as long as they sit on the list.
                cur = unsafe { core::ptr::read(cur as *const usize) };
                n += 1;
            }
            Some(n)
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::SegmentList;

    fn backed_list() -> (&'static SegmentList, SegmentId) {
        let list: &'static SegmentList = Box::leak(Box::new(SegmentList::new()));
        let storage: &'static mut [u8] = Box::leak(Box::new([0u8; 4096]));
        let seg = list.create_backed(Some("heap"), storage, PADDING_NONE).unwrap();
        (list, seg)
    }

    #[test]
    fn create_rejects_unbacked_segment() {
        let list = SegmentList::new();
        let seg = list.create(None, 0x8000, 0x100, PADDING_NONE).unwrap();
        assert!(matches!(
            DynPool::create(None, &list, seg, 16, 4, 2, Some(4)),
            Err(MemError::Unsup)
        ));
    }

    #[test]
    fn create_parameter_checks() {
        let (list, seg) = backed_list();
        assert!(matches!(
            DynPool::create(None, list, seg, 0, 4, 0, None),
            Err(MemError::InvalidBlkSize)
        ));
        assert!(matches!(
            DynPool::create(None, list, seg, 16, 5, 0, None),
            Err(MemError::InvalidBlkAlign)
        ));
        assert!(matches!(
            DynPool::create(None, list, seg, 16, 4, 5, Some(4)),
            Err(MemError::InvalidBlkNbr)
        ));
    }

    #[test]
    fn grows_to_limit_then_reports_empty() {
        // Two initial blocks, limit four: the third and fourth get grow the
        // pool, the fifth fails.
        let (list, seg) = backed_list();
        let pool = DynPool::create(Some("test pool"), list, seg, 16, 4, 2, Some(4)).unwrap();

        assert_eq!(pool.free_list_len(16), Some(2));
        assert_eq!(pool.remaining().unwrap(), 4);

        let mut blocks = std::vec::Vec::new();
        for _ in 0..4 {
            blocks.push(pool.get().unwrap());
        }
        assert_eq!(pool.remaining().unwrap(), 0);
        assert_eq!(pool.get(), Err(MemError::PoolEmpty));

        // Recycling: the freed block is the next one handed out.
        let freed = blocks[1];
        pool.free(freed).unwrap();
        assert_eq!(pool.get().unwrap(), freed);
    }

    #[test]
    fn free_list_word_is_pool_owned() {
        let (list, seg) = backed_list();
        let pool = DynPool::create(None, list, seg, 16, 4, 2, Some(4)).unwrap();

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();

        // Scribble over the leading word of a live block, then free it;
        // the pool overwrites it with the list link and stays consistent.
        // SAFETY: `a` is a live block we own, 16 bytes long.
        unsafe { core::ptr::write(a as *mut usize, 0xAAAA_AAAA) };
        pool.free(a).unwrap();
        pool.free(b).unwrap();

        assert_eq!(pool.free_list_len(16), Some(2));
        assert_eq!(pool.get().unwrap(), b);
        assert_eq!(pool.get().unwrap(), a);
    }

    #[test]
    fn unlimited_pool_has_no_remaining_count() {
        let (list, seg) = backed_list();
        let pool = DynPool::create(None, list, seg, 8, 4, 0, None).unwrap();
        assert_eq!(pool.remaining(), Err(MemError::PoolUnlimited));

        // Unlimited pools still grow and recycle.
        let a = pool.get().unwrap();
        pool.free(a).unwrap();
        assert_eq!(pool.get().unwrap(), a);
    }

    #[test]
    fn free_rejects_null_and_overfree() {
        let (list, seg) = backed_list();
        let pool = DynPool::create(None, list, seg, 16, 4, 1, Some(2)).unwrap();

        assert_eq!(pool.free(0), Err(MemError::NullPtr));

        let a = pool.get().unwrap();
        pool.free(a).unwrap();
        assert_eq!(pool.free(a), Err(MemError::PoolFull));
    }

    #[test]
    fn rollback_on_segment_exhaustion() {
        // Segment too small to grow: the speculative count bump must be
        // rolled back so a later free/get cycle still works.
        let list: &'static SegmentList = Box::leak(Box::new(SegmentList::new()));
        let storage: &'static mut [u8] = Box::leak(Box::new([0u8; 32]));
        let seg = list.create_backed(None, storage, PADDING_NONE).unwrap();
        let pool = DynPool::create(None, list, seg, 16, 4, 2, Some(4)).unwrap();

        let a = pool.get().unwrap();
        let _b = pool.get().unwrap();
        assert_eq!(pool.get(), Err(MemError::SegOvf));
        assert_eq!(pool.remaining().unwrap(), 2);

        pool.free(a).unwrap();
        assert_eq!(pool.get().unwrap(), a);
    }

    #[test]
    fn free_list_walk_terminates_and_counts() {
        // Property: the walk visits exactly (blocks created) − (blocks out).
        let (list, seg) = backed_list();
        let pool = DynPool::create(None, list, seg, 16, 8, 4, Some(8)).unwrap();

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        assert_eq!(pool.free_list_len(32), Some(2));

        pool.free(b).unwrap();
        assert_eq!(pool.free_list_len(32), Some(3));
        pool.free(a).unwrap();
        assert_eq!(pool.free_list_len(32), Some(4));

        // Every listed block lies on the grid.
        let stride = pool.block_size();
        let first = pool.get().unwrap();
        let second = pool.get().unwrap();
        assert_eq!(first % stride, second % stride);
    }
}
