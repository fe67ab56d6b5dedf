//! NVM device descriptors and the driver op-table.

use thiserror_no_std::Error;

/// Errors returned by NVM operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NvmError {
    /// Address, length or alignment violates the device constraints.
    #[error("invalid argument")]
    Inval,
    /// The underlying hardware reported a failure. Not retried here.
    #[error("input/output error")]
    Io,
    /// The backend does not implement this operation.
    #[error("operation not supported")]
    Unsup,
}

/// Device capability and type flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceFlags(u32);

impl DeviceFlags {
    /// NOR-flash style storage: erase-before-write, erased state 0xFF.
    pub const FLASH: Self = Self(1 << 0);
    /// EEPROM style storage: byte-writable in place.
    pub const EEPROM: Self = Self(1 << 1);
    /// Device accepts write operations.
    pub const WRITE: Self = Self(1 << 2);
    /// Device accepts erase operations.
    pub const ERASE: Self = Self(1 << 3);
    /// Writes are committed without an explicit sync.
    pub const AUTO_SYNC: Self = Self(1 << 4);

    /// `true` when every flag in `other` is present.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for DeviceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Static parameters of an NVM device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NvmInfo {
    /// Smallest writable granule, in bytes (1 for legacy parts, 32 for
    /// parts with ECC lines).
    pub write_size: usize,
    /// Erase block size, in bytes.
    pub erase_size: usize,
    /// Guaranteed erase endurance of one block.
    pub erase_cycles: u32,
    /// Type and capability flags.
    pub device_info: DeviceFlags,
}

/// Driver op-table for one NVM device.
///
/// Implementations carry their own state behind interior mutability: a
/// single device instance is shared by every area mounted on it, exactly
/// like the `const` device descriptors the drivers register at boot.
/// `read` must serve byte-granular requests; `write` is byte-granular at
/// this interface and may buffer internally to honour
/// [`NvmInfo::write_size`].
pub trait NvmDevice {
    /// Static device parameters.
    fn info(&self) -> &NvmInfo;

    /// Total device size in bytes.
    fn size(&self) -> usize;

    /// Read `data.len()` bytes starting at device address `address`.
    ///
    /// # Errors
    ///
    /// `Inval` for an out-of-range request, `Io` on hardware failure.
    fn read(&self, address: u32, data: &mut [u8]) -> Result<(), NvmError>;

    /// Write `data` starting at device address `address`.
    ///
    /// After success the bytes are committed, or will be on the next
    /// [`NvmDevice::sync`] when the device does not advertise
    /// [`DeviceFlags::AUTO_SYNC`].
    ///
    /// # Errors
    ///
    /// `Inval` for an out-of-range request, `Unsup` for read-only
    /// devices, `Io` on hardware failure.
    fn write(&self, address: u32, data: &[u8]) -> Result<(), NvmError>;

    /// Erase `size` bytes starting at `address`.
    ///
    /// Both must be multiples of [`NvmInfo::erase_size`], and the range
    /// must lie inside the device.
    ///
    /// # Errors
    ///
    /// `Inval` on an alignment or bounds violation, `Unsup` for devices
    /// without erase, `Io` on hardware failure.
    fn erase(&self, address: u32, size: usize) -> Result<(), NvmError>;

    /// Commit buffered writes. The default is a no-op for devices that
    /// need none.
    ///
    /// # Errors
    ///
    /// `Io` on hardware failure.
    fn sync(&self) -> Result<(), NvmError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_compose_and_query() {
        let flags = DeviceFlags::FLASH | DeviceFlags::WRITE | DeviceFlags::ERASE;
        assert!(flags.contains(DeviceFlags::FLASH));
        assert!(flags.contains(DeviceFlags::WRITE | DeviceFlags::ERASE));
        assert!(!flags.contains(DeviceFlags::EEPROM));
        assert!(!flags.contains(DeviceFlags::AUTO_SYNC));
    }
}
