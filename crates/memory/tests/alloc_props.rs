//! Property tests for the bump allocator and the block pools.

#![allow(clippy::unwrap_used)]

use memory::{DynPool, FixedPool, MemError, SegmentList, PADDING_NONE};
use proptest::prelude::*;

fn round_up(v: usize, a: usize) -> usize {
    (v + (a - 1)) & !(a - 1)
}

proptest! {
    /// Successful allocations are pairwise disjoint and aligned to
    /// `max(align, padding_align)`.
    #[test]
    fn allocations_disjoint_and_aligned(
        reqs in prop::collection::vec(
            (1usize..64, 0u32..5, 0u32..5),
            1..16,
        )
    ) {
        let list = SegmentList::new();
        let seg = list.create(Some("heap"), 0x1_0000, 0x1000, PADDING_NONE).unwrap();

        let mut granted: Vec<(usize, usize)> = Vec::new();
        for (size, align_pow, pad_pow) in reqs {
            let align = 1usize << align_pow;
            let padding = 1usize << pad_pow;
            if let Ok(addr) = list.alloc(seg, None, size, align, padding, None) {
                prop_assert_eq!(addr % align.max(padding), 0);
                for &(start, len) in &granted {
                    let disjoint = addr + size <= start || start + len <= addr;
                    prop_assert!(disjoint, "blocks overlap");
                }
                granted.push((addr, size));
            }
        }
    }

    /// `next_free − base` equals the sum of padded sizes plus alignment gaps.
    #[test]
    fn used_bytes_account_for_padding_and_gaps(
        reqs in prop::collection::vec(
            (1usize..64, 0u32..4),
            1..16,
        ),
        pad_pow in 0u32..5,
    ) {
        let padding = 1usize << pad_pow;
        let list = SegmentList::new();
        let seg = list.create(Some("heap"), 0x1_0000, 0x1000, padding).unwrap();

        let mut expected_next = 0x1_0000usize;
        for (size, align_pow) in reqs {
            let align = 1usize << align_pow;
            if let Ok(addr) = list.alloc_hw(seg, None, size, align, None) {
                let block_start = round_up(expected_next, align.max(padding));
                prop_assert_eq!(addr, block_start);
                expected_next = round_up(block_start + size, padding);
            }
        }

        let mut info = memory::SegInfo::default();
        list.rem_size(seg, 1, Some(&mut info)).unwrap();
        prop_assert_eq!(info.used, expected_next - 0x1_0000);
    }

    /// Fixed pool: interleaved get/free sequences keep the free count in
    /// bounds and recycle only granted blocks.
    #[test]
    fn fixed_pool_cursor_stays_in_bounds(ops in prop::collection::vec(any::<bool>(), 1..64)) {
        let list = SegmentList::new();
        let seg = list.create(None, 0x4000, 0x1000, PADDING_NONE).unwrap();
        let pool: FixedPool<6> = FixedPool::create(&list, seg, 16, 8).unwrap();

        let mut held: Vec<usize> = Vec::new();
        for take in ops {
            if take {
                match pool.get() {
                    Ok(blk) => {
                        prop_assert!(!held.contains(&blk));
                        held.push(blk);
                    }
                    Err(e) => prop_assert_eq!(e, MemError::PoolEmpty),
                }
            } else if let Some(blk) = held.pop() {
                pool.free(blk).unwrap();
            }
            prop_assert!(pool.available() <= 6);
            prop_assert_eq!(pool.available(), 6 - held.len());
        }
    }

    /// Dynamic pool: get/free sequences never lose or duplicate blocks.
    #[test]
    fn dyn_pool_conserves_blocks(ops in prop::collection::vec(any::<bool>(), 1..64)) {
        let list: &'static SegmentList = Box::leak(Box::new(SegmentList::new()));
        let storage: &'static mut [u8] = Box::leak(Box::new([0u8; 2048]));
        let seg = list.create_backed(None, storage, PADDING_NONE).unwrap();
        let pool = DynPool::create(None, list, seg, 16, 8, 2, Some(6)).unwrap();

        let mut held: Vec<usize> = Vec::new();
        for take in ops {
            if take {
                match pool.get() {
                    Ok(blk) => {
                        prop_assert!(!held.contains(&blk));
                        held.push(blk);
                    }
                    Err(e) => {
                        prop_assert_eq!(e, MemError::PoolEmpty);
                        prop_assert_eq!(held.len(), 6);
                    }
                }
            } else if let Some(blk) = held.pop() {
                pool.free(blk).unwrap();
            }
            prop_assert_eq!(pool.remaining().unwrap(), 6 - held.len());
        }
    }

    /// Byte copy equals octet-wise reference at arbitrary offsets.
    #[test]
    fn copy_matches_reference(
        data in prop::collection::vec(any::<u8>(), 0..128),
        dst_off in 0usize..8,
        src_off in 0usize..8,
    ) {
        let src = {
            let mut v = vec![0u8; src_off];
            v.extend_from_slice(&data);
            v
        };
        let mut dst = vec![0u8; dst_off + data.len()];
        let n = memory::bytes::copy(&mut dst[dst_off..], &src[src_off..]);
        prop_assert_eq!(n, data.len().min(src.len() - src_off));
        prop_assert_eq!(&dst[dst_off..dst_off + n], &src[src_off..src_off + n]);
    }

    /// Compare agrees with slice equality at every offset combination.
    #[test]
    fn compare_matches_slice_eq(
        a in prop::collection::vec(any::<u8>(), 0..96),
        b in prop::collection::vec(any::<u8>(), 0..96),
    ) {
        prop_assert_eq!(memory::bytes::compare(&a, &b), a == b);
        prop_assert!(memory::bytes::compare(&a, &a.clone()));
    }
}
