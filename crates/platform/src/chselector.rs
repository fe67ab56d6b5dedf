//! Channel-selector knob position tracking.
//!
//! Both encoder pins are wired to edge interrupts sharing one handler,
//! which feeds the sampled pin pair into the half-step decoder and moves
//! the position counter on each completed step. The counter is written
//! only from the interrupt handler; since interrupts do not nest, readers
//! on the thread side need no further synchronisation. A plain relaxed
//! load observes the latest committed value.

use core::sync::atomic::{AtomicI8, AtomicU8, Ordering};

use crate::qdec::{
    HALF_STEP_STATE_TRANSITIONS, QDECODER_EVENT_BITMASK, QDECODER_EVENT_CCW, QDECODER_EVENT_CW,
    QDECODER_STATE_BITMASK,
};

/// Knob position decoder fed from the pin-edge interrupt handler.
pub struct ChannelSelector {
    last_state: AtomicU8,
    position: AtomicI8,
}

impl ChannelSelector {
    /// New selector at position zero, decoder in the rest state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_state: AtomicU8::new(0),
            position: AtomicI8::new(0),
        }
    }

    /// Feed one edge-interrupt sample into the decoder.
    ///
    /// To be called from the pin-change interrupt handler with the
    /// freshly read pin levels.
    pub fn on_edge(&self, pin_a: bool, pin_b: bool) {
        let sample = ((pin_b as usize) << 1) | (pin_a as usize);
        let state = self.last_state.load(Ordering::Relaxed) as usize;

        let cell = HALF_STEP_STATE_TRANSITIONS[state][sample];
        self.last_state
            .store(cell & QDECODER_STATE_BITMASK, Ordering::Relaxed);

        match cell & QDECODER_EVENT_BITMASK {
            QDECODER_EVENT_CW => {
                let p = self.position.load(Ordering::Relaxed);
                self.position.store(p.wrapping_add(1), Ordering::Relaxed);
            }
            QDECODER_EVENT_CCW => {
                let p = self.position.load(Ordering::Relaxed);
                self.position.store(p.wrapping_sub(1), Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Current knob position.
    ///
    /// Eventually consistent with respect to in-flight interrupts; that
    /// is the intended semantics for the UI poll loop.
    #[must_use]
    pub fn position(&self) -> i8 {
        self.position.load(Ordering::Relaxed)
    }
}

impl Default for ChannelSelector {
    fn default() -> Self {
        Self::new()
    }
}
