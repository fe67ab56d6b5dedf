//! Unified GPIO capability set.
//!
//! A [`GpioPort`] value stands for one bank of pins, no matter what backs
//! it: a native MCU port with memory-mapped registers, or a chain of
//! serial-in parallel-out shift registers reached over SPI. Consumers hold
//! `(port, pin)` pairs and call through the capability set; only board
//! bring-up code knows the concrete type.

use thiserror_no_std::Error;

/// Pin configuration for ports that support reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// High-impedance input.
    Input,
    /// Input with the internal pull-up enabled.
    InputPullUp,
    /// Input with the internal pull-down enabled.
    InputPullDown,
    /// Analog function, digital path disconnected.
    Analog,
    /// Push-pull output.
    Output,
    /// Open-drain output.
    OpenDrain,
    /// Peripheral alternate function with the given function number.
    Alternate(u8),
}

/// GPIO operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioError {
    /// The backend cannot perform this operation (shift-register chains
    /// have no per-pin mode).
    #[error("operation not supported")]
    Unsup,
}

/// Capability set of one GPIO bank.
///
/// `set`/`clear`/`read` never suspend and are interrupt-safe. Whether a
/// `set` is a single register write or a full SPI retransmit is the
/// backend's business.
pub trait GpioPort {
    /// Drive `pin` high.
    fn set(&self, pin: u8);

    /// Drive `pin` low.
    fn clear(&self, pin: u8);

    /// Current logic state of `pin`. Output-only backends report the
    /// last driven state.
    fn read(&self, pin: u8) -> bool;

    /// Reconfigure `pin`.
    ///
    /// # Errors
    ///
    /// `Unsup` for backends without per-pin configuration.
    fn mode(&self, pin: u8, mode: Mode) -> Result<(), GpioError> {
        let _ = (pin, mode);
        Err(GpioError::Unsup)
    }
}

/// A pin reference: one bank plus a pin index on it.
///
/// This is the currency board definitions trade in; drivers store these
/// and stay oblivious to the backing port type.
#[derive(Clone, Copy)]
pub struct PinRef<'a> {
    /// Port the pin belongs to.
    pub port: &'a dyn GpioPort,
    /// Pin index within the port.
    pub pin: u8,
}

impl PinRef<'_> {
    /// Drive the pin high.
    pub fn set(&self) {
        self.port.set(self.pin);
    }

    /// Drive the pin low.
    pub fn clear(&self) {
        self.port.clear(self.pin);
    }

    /// Read the pin state.
    #[must_use]
    pub fn read(&self) -> bool {
        self.port.read(self.pin)
    }

    /// Reconfigure the pin.
    ///
    /// # Errors
    ///
    /// `Unsup` for backends without per-pin configuration.
    pub fn mode(&self, mode: Mode) -> Result<(), GpioError> {
        self.port.mode(self.pin, mode)
    }
}
