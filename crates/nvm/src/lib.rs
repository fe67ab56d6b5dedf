//! Non-volatile memory abstraction.
//!
//! Storage hardware is described by an op-table: a [`NvmDevice`]
//! implementation carries the static device parameters ([`NvmInfo`]) and
//! the byte-granular read/write/erase entry points. On top of devices sit
//! [`NvmArea`]s, named windows into a device, optionally subdivided into
//! [`NvmPartition`]s, through which all higher-level code (channel and
//! contact storage, settings, calibration) accesses the hardware.
//!
//! Flash parts with heterogeneous sector sizes (several 16 KiB sectors,
//! then 64 KiB, then 128 KiB) are handled by the [`flash`] region tables,
//! which turn an address range into physical sector indexes for erase.
//!
//! Reads and writes may suspend the caller while the device works; none of
//! the entry points here are interrupt-safe.

#![cfg_attr(not(test), no_std)]

mod area;
mod device;
pub mod flash;
mod storage;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use area::{NvmArea, NvmPartition};
pub use device::{DeviceFlags, NvmDevice, NvmError, NvmInfo};
pub use storage::AreaStorage;
