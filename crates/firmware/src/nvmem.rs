//! Non-volatile memory map of the target.
//!
//! A target publishes its NVM layout as an ordered table of areas
//! (external flash, the calibration security registers, the hardware
//! info register). Higher layers look areas up by index or by name
//! instead of hard-coding device handles.

use nvm::NvmArea;

/// Ordered table of the target's NVM areas.
pub struct NvmDescriptors<'a> {
    areas: &'a [NvmArea<'a>],
}

impl<'a> NvmDescriptors<'a> {
    /// Wrap the target's area table.
    #[must_use]
    pub const fn new(areas: &'a [NvmArea<'a>]) -> Self {
        Self { areas }
    }

    /// Area at `index`, or `None` past the end of the table.
    #[must_use]
    pub fn descriptor(&self, index: usize) -> Option<&NvmArea<'a>> {
        self.areas.get(index)
    }

    /// First area with the given name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&NvmArea<'a>> {
        self.areas.iter().find(|a| a.name() == name)
    }

    /// Number of areas the target exposes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// `true` when the target exposes no areas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
