//! Sector layout handling for flash parts with heterogeneous sectors.
//!
//! Parts in this family mix sector sizes within one die: typically four
//! 16 KiB sectors, one 64 KiB sector, then 128 KiB sectors to the end.
//! Each device instance covers one homogeneous region and carries a
//! [`FlashRegion`] describing where that region sits and which physical
//! sector number it starts at; erase requests resolve through it.

use core::ops::Range;

use crate::{NvmError, NvmInfo};

/// Upper bound marker: the region extends to the end of the part, whose
/// total size is only known at runtime.
pub const REGION_UNBOUNDED: u32 = 0xFFFF_FFFF;

/// One homogeneous-sector region of a flash part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashRegion {
    /// First address covered by this region.
    pub address_low: u32,
    /// Last address covered, or [`REGION_UNBOUNDED`] to clamp at the
    /// part's reported total size.
    pub address_high: u32,
    /// Physical index of the first sector in this region.
    pub first_sector: u32,
}

impl FlashRegion {
    /// Bounds-check an access of `len` bytes at `address`.
    ///
    /// For an unbounded region the upper limit is
    /// `part_base + total_size`, matching parts that report their size at
    /// runtime.
    ///
    /// # Errors
    ///
    /// `Inval` when the range leaves the region.
    pub fn check(
        &self,
        part_base: u32,
        total_size: usize,
        address: u32,
        len: usize,
    ) -> Result<(), NvmError> {
        if address < self.address_low {
            return Err(NvmError::Inval);
        }

        let end = (address as u64) + (len as u64);
        let limit = if self.address_high == REGION_UNBOUNDED {
            (part_base as u64) + (total_size as u64)
        } else {
            (self.address_high as u64) + 1
        };
        if end > limit {
            return Err(NvmError::Inval);
        }

        Ok(())
    }

    /// Resolve an erase request to a range of physical sector indexes.
    ///
    /// Both `address` and `size` must be multiples of the erase unit.
    ///
    /// # Errors
    ///
    /// `Inval` on a granularity violation or when the range leaves the
    /// region.
    pub fn sector_range(
        &self,
        info: &NvmInfo,
        part_base: u32,
        total_size: usize,
        address: u32,
        size: usize,
    ) -> Result<Range<u32>, NvmError> {
        let erase = info.erase_size;
        if erase == 0
            || (address as usize) % erase != 0
            || size % erase != 0
        {
            return Err(NvmError::Inval);
        }
        self.check(part_base, total_size, address, size)?;

        let first = self.first_sector + (address - self.address_low) / (erase as u32);
        let count = (size / erase) as u32;
        Ok(first..first + count)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::DeviceFlags;

    const INFO_16K: NvmInfo = NvmInfo {
        write_size: 1,
        erase_size: 16 * 1024,
        erase_cycles: 10_000,
        device_info: DeviceFlags::FLASH,
    };

    const INFO_128K: NvmInfo = NvmInfo {
        write_size: 1,
        erase_size: 128 * 1024,
        erase_cycles: 10_000,
        device_info: DeviceFlags::FLASH,
    };

    // The 16 KiB x 4 region of a 1 MiB part mapped at 0x0800_0000.
    const REGION_16K: FlashRegion = FlashRegion {
        address_low: 0x0800_0000,
        address_high: 0x0800_FFFF,
        first_sector: 0,
    };

    // 128 KiB sectors from 0x0802_0000 to the end of the part.
    const REGION_128K: FlashRegion = FlashRegion {
        address_low: 0x0802_0000,
        address_high: REGION_UNBOUNDED,
        first_sector: 5,
    };

    const PART_BASE: u32 = 0x0800_0000;
    const PART_SIZE: usize = 1024 * 1024;

    #[test]
    fn check_rejects_below_and_above() {
        assert_eq!(
            REGION_16K.check(PART_BASE, PART_SIZE, 0x0700_0000, 4),
            Err(NvmError::Inval)
        );
        assert!(REGION_16K
            .check(PART_BASE, PART_SIZE, 0x0800_C000, 0x4000)
            .is_ok());
        assert_eq!(
            REGION_16K.check(PART_BASE, PART_SIZE, 0x0800_C000, 0x4001),
            Err(NvmError::Inval)
        );
    }

    #[test]
    fn unbounded_region_clamps_to_part_size() {
        // Last 128 KiB sector of the 1 MiB part ends at 0x0810_0000.
        assert!(REGION_128K
            .check(PART_BASE, PART_SIZE, 0x080E_0000, 0x2_0000)
            .is_ok());
        assert_eq!(
            REGION_128K.check(PART_BASE, PART_SIZE, 0x080E_0000, 0x2_0001),
            Err(NvmError::Inval)
        );
    }

    #[test]
    fn sector_resolution_offsets_by_first_sector() {
        let r = REGION_16K
            .sector_range(&INFO_16K, PART_BASE, PART_SIZE, 0x0800_8000, 0x8000)
            .unwrap();
        assert_eq!(r, 2..4);

        let r = REGION_128K
            .sector_range(&INFO_128K, PART_BASE, PART_SIZE, 0x0804_0000, 0x4_0000)
            .unwrap();
        assert_eq!(r, 6..8);
    }

    #[test]
    fn sector_range_enforces_granularity() {
        assert_eq!(
            REGION_16K.sector_range(&INFO_16K, PART_BASE, PART_SIZE, 0x0800_0100, 0x4000),
            Err(NvmError::Inval)
        );
        assert_eq!(
            REGION_16K.sector_range(&INFO_16K, PART_BASE, PART_SIZE, 0x0800_4000, 0x2000),
            Err(NvmError::Inval)
        );
    }
}
