//! Platform support layer: GPIO, channel selector and low-level
//! synchronization.
//!
//! Everything that touches pins goes through the [`gpio::GpioPort`]
//! capability set, whether the pin lives on an MCU port or at the far end
//! of an SPI shift-register chain; the drivers above (LED, mute, band
//! selector, chip-select) do not know the difference.
//!
//! The [`sync::WaitPoint`] cell is the one suspension primitive of the
//! runtime: a single thread parks on it, an interrupt handler releases it.
//! Audio stream synchronisation and tone playback completion are built on
//! top of it.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod chselector;
pub mod gpio;
pub mod qdec;
pub mod shift_reg;
pub mod sync;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use chselector::ChannelSelector;
pub use gpio::{GpioError, GpioPort, Mode};
pub use shift_reg::ShiftRegChain;
pub use sync::{WaitOutcome, WaitPoint};
