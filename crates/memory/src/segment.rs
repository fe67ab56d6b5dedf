//! Memory segments: named address ranges with bump allocation.
//!
//! A [`SegmentList`] holds every segment registered by one runtime instance.
//! The firmware owns a single list created at boot; hosted tests build
//! private lists so they never interfere with each other. Creation walks the
//! whole list inside one critical section, so two concurrent `create` calls
//! can never both succeed with overlapping ranges.
//!
//! Segments are never destroyed. [`SegmentList::clear`] rewinds the bump
//! cursor of one segment and exists for bulk-reuse scenarios only; it is
//! compiled out whenever allocation tracking is enabled, because tracking
//! records would keep describing allocations that no longer exist.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;

use crate::{is_pow2, round_up, MemError};

/// Padding-alignment sentinel: no padding between allocations.
pub const PADDING_NONE: usize = 1;

/// Maximum number of segments one list can hold.
const MAX_SEGMENTS: usize = 8;

/// Maximum tracked allocation names per segment.
#[cfg(feature = "alloc-trace")]
const MAX_TRACE_RECORDS: usize = 16;

/// Handle to a segment inside one [`SegmentList`].
///
/// Handles are only meaningful for the list that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SegmentId(usize);

/// Snapshot of a segment returned by [`SegmentList::rem_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SegInfo {
    /// Total capacity in bytes.
    pub total: usize,
    /// Bytes consumed so far, including alignment gaps and padding.
    pub used: usize,
    /// First byte address.
    pub base: usize,
    /// Address the next allocation would start at for the queried alignment,
    /// or zero when the segment cannot fit it.
    pub next_aligned: usize,
}

#[cfg(feature = "alloc-trace")]
#[derive(Debug, Clone, Copy)]
struct AllocRecord {
    name: Option<&'static str>,
    total: usize,
}

#[derive(Debug)]
struct Segment {
    name: Option<&'static str>,
    base: usize,
    /// Inclusive last byte address.
    end: usize,
    next: usize,
    padding_align: usize,
    /// Whether the range maps real, writable memory. Only backed segments
    /// may feed block pools that store data inside their blocks.
    backed: bool,
    #[cfg(feature = "alloc-trace")]
    allocs: Vec<AllocRecord, MAX_TRACE_RECORDS>,
}

/// Registry of memory segments with a LIFO creation order.
pub struct SegmentList {
    segments: Mutex<RefCell<Vec<Segment, MAX_SEGMENTS>>>,
}

impl SegmentList {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Register a segment over a bare address range.
    ///
    /// The range is bookkeeping only: nothing in this crate will dereference
    /// addresses handed out from it. Use [`SegmentList::create_backed`] for
    /// a segment that must feed a [`crate::DynPool`].
    ///
    /// # Errors
    ///
    /// `InvalidSegSize` for a zero size or an address-space overflow,
    /// `InvalidMemAlign` for a padding alignment that is neither a power of
    /// two nor [`PADDING_NONE`], `InvalidSegOverlap` / `InvalidSegExists`
    /// when the range intersects or duplicates a registered segment, and
    /// `SegListFull` when every slot is taken.
    pub fn create(
        &self,
        name: Option<&'static str>,
        base: usize,
        size: usize,
        padding_align: usize,
    ) -> Result<SegmentId, MemError> {
        self.create_inner(name, base, size, padding_align, false)
    }

    /// Register a segment over caller-provided memory.
    ///
    /// The storage must outlive the list, which in firmware means a leaked
    /// or `static` buffer. Segments created this way may back dynamic pools.
    ///
    /// # Errors
    ///
    /// Same as [`SegmentList::create`].
    pub fn create_backed(
        &self,
        name: Option<&'static str>,
        storage: &'static mut [u8],
        padding_align: usize,
    ) -> Result<SegmentId, MemError> {
        let base = storage.as_mut_ptr() as usize;
        self.create_inner(name, base, storage.len(), padding_align, true)
    }

    fn create_inner(
        &self,
        name: Option<&'static str>,
        base: usize,
        size: usize,
        padding_align: usize,
        backed: bool,
    ) -> Result<SegmentId, MemError> {
        if size < 1 {
            return Err(MemError::InvalidSegSize);
        }
        let end = base
            .checked_add(size - 1)
            .ok_or(MemError::InvalidSegSize)?;
        if padding_align != PADDING_NONE && !is_pow2(padding_align) {
            return Err(MemError::InvalidMemAlign);
        }

        // Overlap check and insertion share one critical section so that a
        // reentrant create cannot slip a conflicting range in between.
        critical_section::with(|cs| {
            let mut segs = self.segments.borrow_ref_mut(cs);

            for seg in segs.iter().rev() {
                if base == seg.base && end == seg.end {
                    return Err(MemError::InvalidSegExists);
                }
                if (base >= seg.base && base <= seg.end)
                    || (base <= seg.base && end >= seg.base)
                {
                    return Err(MemError::InvalidSegOverlap);
                }
            }

            let id = SegmentId(segs.len());
            segs.push(Segment {
                name,
                base,
                end,
                next: base,
                padding_align,
                backed,
                #[cfg(feature = "alloc-trace")]
                allocs: Vec::new(),
            })
            .map_err(|_| MemError::SegListFull)?;

            Ok(id)
        })
    }

    /// Allocate `size` bytes from `seg`, aligned to `align`, padding the
    /// *next* allocation to `padding_align`.
    ///
    /// The returned address is aligned to `max(align, padding_align)`; the
    /// bump cursor advances to `round_up(addr + size, padding_align)` so the
    /// following allocation starts on a padded boundary. Never suspends and
    /// is safe from interrupt context.
    ///
    /// On `SegOvf`, `bytes_needed` (when provided) receives the deficit: the
    /// number of extra bytes the segment would have needed for this request.
    ///
    /// # Errors
    ///
    /// `InvalidMemSize`, `InvalidMemAlign`, `SegOvf`; with allocation
    /// tracking compiled in, `HeapOvf` when the record store is exhausted.
    pub fn alloc(
        &self,
        seg: SegmentId,
        name: Option<&'static str>,
        size: usize,
        align: usize,
        padding_align: usize,
        bytes_needed: Option<&mut usize>,
    ) -> Result<usize, MemError> {
        if size < 1 {
            return Err(MemError::InvalidMemSize);
        }
        if !is_pow2(align) {
            return Err(MemError::InvalidMemAlign);
        }
        if padding_align != PADDING_NONE && !is_pow2(padding_align) {
            return Err(MemError::InvalidMemAlign);
        }

        critical_section::with(|cs| {
            let mut segs = self.segments.borrow_ref_mut(cs);
            let seg = segs.get_mut(seg.0).ok_or(MemError::NullPtr)?;
            Self::alloc_in(seg, name, size, align, padding_align, bytes_needed)
        })
    }

    /// Allocate using the segment's own stored padding alignment.
    ///
    /// This is the form drivers use for DMA and cache-line sensitive
    /// buffers: the segment is created once with the hardware's padding
    /// requirement and every allocation inherits it.
    ///
    /// # Errors
    ///
    /// Same as [`SegmentList::alloc`].
    pub fn alloc_hw(
        &self,
        seg: SegmentId,
        name: Option<&'static str>,
        size: usize,
        align: usize,
        bytes_needed: Option<&mut usize>,
    ) -> Result<usize, MemError> {
        if size < 1 {
            return Err(MemError::InvalidMemSize);
        }
        if !is_pow2(align) {
            return Err(MemError::InvalidMemAlign);
        }

        critical_section::with(|cs| {
            let mut segs = self.segments.borrow_ref_mut(cs);
            let seg = segs.get_mut(seg.0).ok_or(MemError::NullPtr)?;
            let padding = seg.padding_align;
            Self::alloc_in(seg, name, size, align, padding, bytes_needed)
        })
    }

    /// Bump-allocate inside an already borrowed segment.
    fn alloc_in(
        seg: &mut Segment,
        name: Option<&'static str>,
        size: usize,
        align: usize,
        padding_align: usize,
        bytes_needed: Option<&mut usize>,
    ) -> Result<usize, MemError> {
        let block_align = align.max(padding_align);

        let block_start = round_up(seg.next, block_align);
        let next_after = block_start
            .checked_add(size)
            .map(|end| round_up(end, padding_align))
            .ok_or(MemError::InvalidMemSize)?;

        let remaining = (seg.end - seg.next) + 1;
        let total = next_after - seg.next;
        if remaining < total {
            if let Some(needed) = bytes_needed {
                *needed = total - remaining;
            }
            return Err(MemError::SegOvf);
        }

        seg.next = next_after;

        #[cfg(feature = "alloc-trace")]
        Self::track(seg, name, size)?;
        #[cfg(not(feature = "alloc-trace"))]
        let _ = name;

        Ok(block_start)
    }

    /// Record `size` bytes under `name`, accumulating by name identity.
    ///
    /// Two allocations share a record iff their names are the very same
    /// static string (pointer identity, not content comparison).
    #[cfg(feature = "alloc-trace")]
    fn track(
        seg: &mut Segment,
        name: Option<&'static str>,
        size: usize,
    ) -> Result<(), MemError> {
        for rec in seg.allocs.iter_mut() {
            let same = match (rec.name, name) {
                (None, None) => true,
                (Some(a), Some(b)) => core::ptr::eq(a.as_ptr(), b.as_ptr()),
                _ => false,
            };
            if same {
                rec.total += size;
                return Ok(());
            }
        }

        seg.allocs
            .push(AllocRecord { name, total: size })
            .map_err(|_| MemError::HeapOvf)
    }

    /// Bytes available from the next `align`-aligned cursor to the end.
    ///
    /// Optionally fills `info` with the segment snapshot.
    ///
    /// # Errors
    ///
    /// `InvalidMemAlign` if `align` is not a power of two.
    pub fn rem_size(
        &self,
        seg: SegmentId,
        align: usize,
        info: Option<&mut SegInfo>,
    ) -> Result<usize, MemError> {
        if !is_pow2(align) {
            return Err(MemError::InvalidMemAlign);
        }

        critical_section::with(|cs| {
            let segs = self.segments.borrow_ref(cs);
            let seg = segs.get(seg.0).ok_or(MemError::NullPtr)?;

            let total = (seg.end - seg.base) + 1;
            let used = seg.next - seg.base;
            let mut next_aligned = round_up(seg.next, align);

            let rem = if next_aligned > seg.end {
                next_aligned = 0;
                0
            } else {
                total - (next_aligned - seg.base)
            };

            if let Some(out) = info {
                *out = SegInfo {
                    total,
                    used,
                    base: seg.base,
                    next_aligned,
                };
            }

            Ok(rem)
        })
    }

    /// Rewind the bump cursor to the segment base.
    ///
    /// Every address previously handed out becomes reusable; the caller is
    /// responsible for having retired them all.
    ///
    /// # Errors
    ///
    /// `Unsup` when allocation tracking is compiled in (the tracking
    /// records would dangle), `NullPtr` for a stale handle.
    #[cfg(not(feature = "alloc-trace"))]
    pub fn clear(&self, seg: SegmentId) -> Result<(), MemError> {
        critical_section::with(|cs| {
            let mut segs = self.segments.borrow_ref_mut(cs);
            let seg = segs.get_mut(seg.0).ok_or(MemError::NullPtr)?;
            seg.next = seg.base;
            Ok(())
        })
    }

    /// Rewinding is rejected while allocation tracking is compiled in.
    ///
    /// # Errors
    ///
    /// Always `Unsup`.
    #[cfg(feature = "alloc-trace")]
    pub fn clear(&self, _seg: SegmentId) -> Result<(), MemError> {
        Err(MemError::Unsup)
    }

    /// Visit every segment, most recently created first.
    ///
    /// Used by the memory usage report at the shell/log level.
    pub fn usage<F: FnMut(Option<&'static str>, SegInfo)>(&self, mut visit: F) {
        critical_section::with(|cs| {
            let segs = self.segments.borrow_ref(cs);
            for seg in segs.iter().rev() {
                visit(
                    seg.name,
                    SegInfo {
                        total: (seg.end - seg.base) + 1,
                        used: seg.next - seg.base,
                        base: seg.base,
                        next_aligned: seg.next,
                    },
                );
            }
        });
    }

    /// Visit the per-name allocation records of one segment.
    ///
    /// # Errors
    ///
    /// `NullPtr` for a stale handle.
    #[cfg(feature = "alloc-trace")]
    pub fn allocations<F: FnMut(Option<&'static str>, usize)>(
        &self,
        seg: SegmentId,
        mut visit: F,
    ) -> Result<(), MemError> {
        critical_section::with(|cs| {
            let segs = self.segments.borrow_ref(cs);
            let seg = segs.get(seg.0).ok_or(MemError::NullPtr)?;
            for rec in seg.allocs.iter() {
                visit(rec.name, rec.total);
            }
            Ok(())
        })
    }

    /// `true` when the segment maps real memory (created via
    /// [`SegmentList::create_backed`]).
    pub(crate) fn is_backed(&self, seg: SegmentId) -> bool {
        critical_section::with(|cs| {
            self.segments
                .borrow_ref(cs)
                .get(seg.0)
                .is_some_and(|s| s.backed)
        })
    }

    /// Stored padding alignment of the segment.
    pub(crate) fn padding_of(&self, seg: SegmentId) -> Result<usize, MemError> {
        critical_section::with(|cs| {
            self.segments
                .borrow_ref(cs)
                .get(seg.0)
                .map(|s| s.padding_align)
                .ok_or(MemError::NullPtr)
        })
    }
}

impl Default for SegmentList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn create_rejects_zero_size_and_overflow() {
        let list = SegmentList::new();
        assert_eq!(
            list.create(None, 0x1000, 0, PADDING_NONE),
            Err(MemError::InvalidSegSize)
        );
        assert_eq!(
            list.create(None, usize::MAX - 2, 8, PADDING_NONE),
            Err(MemError::InvalidSegSize)
        );
    }

    #[test]
    fn create_rejects_bad_padding() {
        let list = SegmentList::new();
        assert_eq!(
            list.create(None, 0x1000, 64, 3),
            Err(MemError::InvalidMemAlign)
        );
    }

    #[test]
    fn overlap_and_duplicate_detection() {
        let list = SegmentList::new();
        list.create(Some("a"), 0x1000, 0x100, PADDING_NONE).unwrap();

        // Exact duplicate.
        assert_eq!(
            list.create(Some("b"), 0x1000, 0x100, PADDING_NONE),
            Err(MemError::InvalidSegExists)
        );
        // Overlap from below, from above, containing, contained.
        assert_eq!(
            list.create(None, 0x0F80, 0x100, PADDING_NONE),
            Err(MemError::InvalidSegOverlap)
        );
        assert_eq!(
            list.create(None, 0x10FF, 0x10, PADDING_NONE),
            Err(MemError::InvalidSegOverlap)
        );
        assert_eq!(
            list.create(None, 0x0F00, 0x1000, PADDING_NONE),
            Err(MemError::InvalidSegOverlap)
        );
        assert_eq!(
            list.create(None, 0x1040, 0x10, PADDING_NONE),
            Err(MemError::InvalidSegOverlap)
        );

        // Adjacent ranges are fine.
        list.create(Some("lo"), 0x0F00, 0x100, PADDING_NONE).unwrap();
        list.create(Some("hi"), 0x1100, 0x100, PADDING_NONE).unwrap();
    }

    #[test]
    fn bump_sequence_matches_documented_example() {
        // Segment at 0x1000, 64 bytes, no padding.
        let list = SegmentList::new();
        let heap = list.create(Some("heap"), 0x1000, 64, PADDING_NONE).unwrap();

        let a = list.alloc(heap, None, 10, 4, PADDING_NONE, None).unwrap();
        assert_eq!(a, 0x1000);

        // 6-byte gap to reach 8-byte alignment.
        let b = list.alloc(heap, None, 20, 8, PADDING_NONE, None).unwrap();
        assert_eq!(b, 0x1010);

        let mut needed = 0;
        let e = list.alloc(heap, None, 40, 1, PADDING_NONE, Some(&mut needed));
        assert_eq!(e, Err(MemError::SegOvf));
        // next_free = 0x1024: 28 bytes remain, 40 requested.
        assert_eq!(needed, 12);
    }

    #[test]
    fn padding_align_pads_the_next_allocation() {
        let list = SegmentList::new();
        let seg = list.create(None, 0x2000, 256, PADDING_NONE).unwrap();

        // Pad every allocation end to 32 bytes: the next one starts on a
        // 32-byte boundary even though it only asks for align 1.
        let a = list.alloc(seg, None, 5, 1, 32, None).unwrap();
        assert_eq!(a, 0x2000);
        let b = list.alloc(seg, None, 1, 1, 1, None).unwrap();
        assert_eq!(b, 0x2020);
    }

    #[test]
    fn alloc_hw_uses_segment_padding() {
        let list = SegmentList::new();
        let seg = list.create(None, 0x2000, 256, 16).unwrap();

        let a = list.alloc_hw(seg, None, 3, 1, None).unwrap();
        assert_eq!(a, 0x2000);
        let b = list.alloc_hw(seg, None, 3, 1, None).unwrap();
        assert_eq!(b, 0x2010);
    }

    #[test]
    fn rem_size_accounts_for_alignment() {
        let list = SegmentList::new();
        let seg = list.create(None, 0x1001, 64, PADDING_NONE).unwrap();

        let mut info = SegInfo::default();
        let rem = list.rem_size(seg, 16, Some(&mut info)).unwrap();
        assert_eq!(info.next_aligned, 0x1010);
        assert_eq!(rem, 64 - (0x1010 - 0x1001));
        assert_eq!(info.total, 64);
        assert_eq!(info.used, 0);

        // Exhaust the segment; remaining drops to zero.
        let _ = list.alloc(seg, None, 64, 1, PADDING_NONE, None).unwrap();
        let rem = list.rem_size(seg, 1, None).unwrap();
        assert_eq!(rem, 0);
    }

    #[cfg(not(feature = "alloc-trace"))]
    #[test]
    fn clear_rewinds_the_cursor() {
        let list = SegmentList::new();
        let seg = list.create(None, 0x1000, 32, PADDING_NONE).unwrap();
        let _ = list.alloc(seg, None, 32, 1, PADDING_NONE, None).unwrap();
        assert_eq!(
            list.alloc(seg, None, 1, 1, PADDING_NONE, None),
            Err(MemError::SegOvf)
        );

        list.clear(seg).unwrap();
        let a = list.alloc(seg, None, 1, 1, PADDING_NONE, None).unwrap();
        assert_eq!(a, 0x1000);
    }

    #[cfg(feature = "alloc-trace")]
    #[test]
    fn clear_is_rejected_while_tracking() {
        let list = SegmentList::new();
        let seg = list.create(None, 0x1000, 32, PADDING_NONE).unwrap();
        assert_eq!(list.clear(seg), Err(MemError::Unsup));
    }

    #[cfg(feature = "alloc-trace")]
    #[test]
    fn allocations_accumulate_by_name_identity() {
        static NAME: &str = "dma buffers";

        let list = SegmentList::new();
        let seg = list.create(None, 0x1000, 0x100, PADDING_NONE).unwrap();
        list.alloc(seg, Some(NAME), 16, 1, PADDING_NONE, None).unwrap();
        list.alloc(seg, Some(NAME), 8, 1, PADDING_NONE, None).unwrap();
        list.alloc(seg, None, 4, 1, PADDING_NONE, None).unwrap();

        let mut seen = std::vec::Vec::new();
        list.allocations(seg, |name, total| seen.push((name, total)))
            .unwrap();
        assert_eq!(seen, vec![(Some(NAME), 24), (None, 4)]);
    }

    #[test]
    fn usage_walks_newest_first() {
        let list = SegmentList::new();
        list.create(Some("first"), 0x1000, 0x10, PADDING_NONE).unwrap();
        list.create(Some("second"), 0x2000, 0x10, PADDING_NONE).unwrap();

        let mut names = std::vec::Vec::new();
        list.usage(|name, _| names.push(name));
        assert_eq!(names, vec![Some("second"), Some("first")]);
    }
}
