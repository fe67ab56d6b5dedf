//! `embedded-storage` adapter for NVM areas.

use embedded_storage::{ReadStorage, Storage};

use crate::{NvmArea, NvmError};

/// Mounts an [`NvmArea`] behind the `embedded-storage` traits so generic
/// storage consumers can use it without knowing about the op-table.
pub struct AreaStorage<'a> {
    area: &'a NvmArea<'a>,
}

impl<'a> AreaStorage<'a> {
    /// Wrap an area.
    #[must_use]
    pub const fn new(area: &'a NvmArea<'a>) -> Self {
        Self { area }
    }
}

impl ReadStorage for AreaStorage<'_> {
    type Error = NvmError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.area.read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.area.size()
    }
}

impl Storage for AreaStorage<'_> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.area.write(offset, bytes)
    }
}
