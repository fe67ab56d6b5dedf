//! GPIO extender built from daisy-chained shift registers.
//!
//! Boards in this family drive LEDs, band selectors and PA controls from
//! 74HC595-style serial-in parallel-out registers fed by SPI, with a
//! strobe line latching the shifted bits onto the outputs. The driver
//! keeps an in-memory mirror of the whole chain: every `set`/`clear`
//! mutates the mirror and retransmits it in full between two strobe
//! edges, and `read` answers from the mirror: there is no way to sample
//! the real outputs.
//!
//! Pin numbering runs opposite to the electrical shift order, so that the
//! pin labels on the board schematic match the numbers in code. Do not
//! "simplify" the indexing: the last bit shifted out lands on output 0.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::gpio::{GpioError, GpioPort, Mode};

struct Inner<SPI, STROBE, const BYTES: usize> {
    spi: SPI,
    strobe: STROBE,
    mirror: [u8; BYTES],
}

/// A chain of shift registers exposed as one [`GpioPort`].
///
/// `BYTES` is the chain length in bytes; `num_outputs` may be smaller
/// than `BYTES * 8` when the last register is only partially used.
pub struct ShiftRegChain<SPI, STROBE, const BYTES: usize> {
    inner: Mutex<RefCell<Inner<SPI, STROBE, BYTES>>>,
    num_outputs: usize,
}

impl<SPI, STROBE, const BYTES: usize> ShiftRegChain<SPI, STROBE, BYTES>
where
    SPI: SpiBus<u8>,
    STROBE: OutputPin,
{
    /// Wrap an SPI bus and a strobe line into a chain of `num_outputs`
    /// pins. Call [`ShiftRegChain::init`] before first use.
    ///
    /// # Errors
    ///
    /// `Unsup` when `num_outputs` is zero or exceeds the chain capacity.
    pub fn new(spi: SPI, strobe: STROBE, num_outputs: usize) -> Result<Self, GpioError> {
        if num_outputs == 0 || num_outputs > BYTES * 8 {
            return Err(GpioError::Unsup);
        }
        Ok(Self {
            inner: Mutex::new(RefCell::new(Inner {
                spi,
                strobe,
                mirror: [0; BYTES],
            })),
            num_outputs,
        })
    }

    /// Clear every output and present the zeros on the chain.
    pub fn init(&self) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.mirror = [0; BYTES];
            Self::flush(&mut inner);
        });
    }

    /// Mirror byte/bit position of `pin`.
    ///
    /// The pin index counts from the far end of the chain: the first byte
    /// shifted out carries the highest-numbered outputs.
    fn position(&self, pin: u8) -> (usize, u8) {
        let byte = (self.num_outputs - 1 - pin as usize) / 8;
        let bit = pin % 8;
        (byte, bit)
    }

    /// Retransmit the mirror and latch it: strobe low, shift all bytes,
    /// strobe high.
    fn flush(inner: &mut Inner<SPI, STROBE, BYTES>) {
        let Inner { spi, strobe, mirror } = inner;
        let _ = strobe.set_low();
        let _ = spi.write(mirror);
        let _ = spi.flush();
        let _ = strobe.set_high();
    }

    fn update(&self, pin: u8, level: bool) {
        if pin as usize >= self.num_outputs {
            return;
        }
        let (byte, bit) = self.position(pin);

        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if level {
                inner.mirror[byte] |= 1 << bit;
            } else {
                inner.mirror[byte] &= !(1 << bit);
            }
            Self::flush(&mut inner);
        });
    }
}

impl<SPI, STROBE, const BYTES: usize> GpioPort for ShiftRegChain<SPI, STROBE, BYTES>
where
    SPI: SpiBus<u8>,
    STROBE: OutputPin,
{
    fn set(&self, pin: u8) {
        self.update(pin, true);
    }

    fn clear(&self, pin: u8) {
        self.update(pin, false);
    }

    fn read(&self, pin: u8) -> bool {
        if pin as usize >= self.num_outputs {
            return false;
        }
        let (byte, bit) = self.position(pin);
        critical_section::with(|cs| {
            (self.inner.borrow_ref(cs).mirror[byte] & (1 << bit)) != 0
        })
    }

    fn mode(&self, _pin: u8, _mode: Mode) -> Result<(), GpioError> {
        Err(GpioError::Unsup)
    }
}
