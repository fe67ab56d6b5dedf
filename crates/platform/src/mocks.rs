//! Logic-level GPIO double for boards under test.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::gpio::{GpioError, GpioPort, Mode};

#[derive(Clone, Copy)]
struct PinState {
    level: bool,
    mode: Option<Mode>,
}

/// A GPIO bank that records levels and modes instead of touching
/// hardware.
pub struct MockPort<const N: usize> {
    pins: Mutex<RefCell<[PinState; N]>>,
}

impl<const N: usize> MockPort<N> {
    /// All pins low, unconfigured.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pins: Mutex::new(RefCell::new(
                [PinState {
                    level: false,
                    mode: None,
                }; N],
            )),
        }
    }

    /// Last mode configured on `pin`, if any.
    #[must_use]
    pub fn mode_of(&self, pin: u8) -> Option<Mode> {
        critical_section::with(|cs| {
            self.pins
                .borrow_ref(cs)
                .get(pin as usize)
                .and_then(|p| p.mode)
        })
    }

    /// Force a level from the "hardware" side, as an input change would.
    pub fn drive(&self, pin: u8, level: bool) {
        critical_section::with(|cs| {
            if let Some(p) = self.pins.borrow_ref_mut(cs).get_mut(pin as usize) {
                p.level = level;
            }
        });
    }
}

impl<const N: usize> Default for MockPort<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> GpioPort for MockPort<N> {
    fn set(&self, pin: u8) {
        self.drive(pin, true);
    }

    fn clear(&self, pin: u8) {
        self.drive(pin, false);
    }

    fn read(&self, pin: u8) -> bool {
        critical_section::with(|cs| {
            self.pins
                .borrow_ref(cs)
                .get(pin as usize)
                .map(|p| p.level)
                .unwrap_or(false)
        })
    }

    fn mode(&self, pin: u8, mode: Mode) -> Result<(), GpioError> {
        critical_section::with(|cs| {
            if let Some(p) = self.pins.borrow_ref_mut(cs).get_mut(pin as usize) {
                p.mode = Some(mode);
            }
        });
        Ok(())
    }
}
