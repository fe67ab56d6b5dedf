//! RAM-backed NVM devices for hosted tests and the desktop target.
//!
//! `RamFlash` keeps NOR semantics: erase sets a sector to 0xFF and a write
//! can only clear bits, so forgetting an erase shows up as corrupted data
//! in tests exactly like it would on hardware.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::flash::{FlashRegion, REGION_UNBOUNDED};
use crate::{DeviceFlags, NvmDevice, NvmError, NvmInfo};

/// Byte-writable EEPROM-style device over borrowed RAM.
pub struct RamEeprom<'a> {
    mem: Mutex<RefCell<&'a mut [u8]>>,
    info: NvmInfo,
}

impl<'a> RamEeprom<'a> {
    /// Wrap `mem` as an EEPROM covering addresses `0..mem.len()`.
    #[must_use]
    pub fn new(mem: &'a mut [u8]) -> Self {
        Self {
            mem: Mutex::new(RefCell::new(mem)),
            info: NvmInfo {
                write_size: 1,
                erase_size: 1,
                erase_cycles: 1_000_000,
                device_info: DeviceFlags::EEPROM
                    | DeviceFlags::WRITE
                    | DeviceFlags::AUTO_SYNC,
            },
        }
    }
}

impl NvmDevice for RamEeprom<'_> {
    fn info(&self) -> &NvmInfo {
        &self.info
    }

    fn size(&self) -> usize {
        critical_section::with(|cs| self.mem.borrow_ref(cs).len())
    }

    fn read(&self, address: u32, data: &mut [u8]) -> Result<(), NvmError> {
        critical_section::with(|cs| {
            let mem = self.mem.borrow_ref(cs);
            let start = address as usize;
            let end = start.checked_add(data.len()).ok_or(NvmError::Inval)?;
            let src = mem.get(start..end).ok_or(NvmError::Inval)?;
            data.copy_from_slice(src);
            Ok(())
        })
    }

    fn write(&self, address: u32, data: &[u8]) -> Result<(), NvmError> {
        critical_section::with(|cs| {
            let mut mem = self.mem.borrow_ref_mut(cs);
            let start = address as usize;
            let end = start.checked_add(data.len()).ok_or(NvmError::Inval)?;
            let dst = mem.get_mut(start..end).ok_or(NvmError::Inval)?;
            dst.copy_from_slice(data);
            Ok(())
        })
    }

    fn erase(&self, _address: u32, _size: usize) -> Result<(), NvmError> {
        Err(NvmError::Unsup)
    }
}

/// NOR-flash style device over borrowed RAM with a homogeneous sector
/// region mapped at `base`.
pub struct RamFlash<'a> {
    mem: Mutex<RefCell<&'a mut [u8]>>,
    info: NvmInfo,
    base: u32,
    region: FlashRegion,
}

impl<'a> RamFlash<'a> {
    /// Map `mem` at `base` with the given erase granule.
    ///
    /// `first_sector` is the physical index of the first sector, as it
    /// would appear in the part's sector numbering.
    #[must_use]
    pub fn new(mem: &'a mut [u8], base: u32, erase_size: usize, first_sector: u32) -> Self {
        Self {
            mem: Mutex::new(RefCell::new(mem)),
            info: NvmInfo {
                write_size: 1,
                erase_size,
                erase_cycles: 10_000,
                device_info: DeviceFlags::FLASH
                    | DeviceFlags::WRITE
                    | DeviceFlags::ERASE
                    | DeviceFlags::AUTO_SYNC,
            },
            base,
            region: FlashRegion {
                address_low: base,
                address_high: REGION_UNBOUNDED,
                first_sector,
            },
        }
    }

    /// Sector region descriptor of this part.
    #[must_use]
    pub fn region(&self) -> &FlashRegion {
        &self.region
    }
}

impl NvmDevice for RamFlash<'_> {
    fn info(&self) -> &NvmInfo {
        &self.info
    }

    fn size(&self) -> usize {
        critical_section::with(|cs| self.mem.borrow_ref(cs).len())
    }

    fn read(&self, address: u32, data: &mut [u8]) -> Result<(), NvmError> {
        critical_section::with(|cs| {
            let mem = self.mem.borrow_ref(cs);
            self.region.check(self.base, mem.len(), address, data.len())?;
            let start = (address - self.base) as usize;
            let src = mem.get(start..start + data.len()).ok_or(NvmError::Inval)?;
            data.copy_from_slice(src);
            Ok(())
        })
    }

    fn write(&self, address: u32, data: &[u8]) -> Result<(), NvmError> {
        critical_section::with(|cs| {
            let mut mem = self.mem.borrow_ref_mut(cs);
            let len = mem.len();
            self.region.check(self.base, len, address, data.len())?;
            let start = (address - self.base) as usize;
            let dst = mem
                .get_mut(start..start + data.len())
                .ok_or(NvmError::Inval)?;
            // NOR writes can only clear bits.
            for (cell, byte) in dst.iter_mut().zip(data) {
                *cell &= byte;
            }
            Ok(())
        })
    }

    fn erase(&self, address: u32, size: usize) -> Result<(), NvmError> {
        critical_section::with(|cs| {
            let mut mem = self.mem.borrow_ref_mut(cs);
            let len = mem.len();
            // Resolving the sector range performs the granularity and
            // bounds checks; the indexes themselves select what to wipe.
            let sectors = self
                .region
                .sector_range(&self.info, self.base, len, address, size)?;

            let erase = self.info.erase_size;
            for sector in sectors {
                let start = ((sector - self.region.first_sector) as usize) * erase;
                let end = start + erase;
                let dst = mem.get_mut(start..end).ok_or(NvmError::Inval)?;
                dst.fill(0xFF);
            }
            Ok(())
        })
    }
}
