//! Target integration: board wiring, vendor data decoding and boot
//! order.
//!
//! The lower crates are target-agnostic; this one binds them to a
//! concrete radio. [`board`] maps the GPIO roles and feeds the audio
//! router, [`calibration`] and [`hwinfo`] decode the vendor's
//! security-register layouts, and [`boot`] brings the substrate up in
//! the order the rest of the firmware depends on.

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod boot;
pub mod calibration;
pub mod hwinfo;
pub mod nvmem;

pub use boot::Substrate;
pub use calibration::{CalData, DualBandCalData};
pub use hwinfo::HwInfo;
pub use nvmem::NvmDescriptors;
