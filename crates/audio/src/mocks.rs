//! Scripted stream drivers and tone hardware for hosted tests.
//!
//! The drivers model the DAC/ADC DMA engines with hand-cranked
//! interrupts: a test (or the desktop target's pump loop) calls
//! [`ScriptedOutputDriver::pump`] wherever real hardware would raise the
//! half-transfer or transfer-complete interrupt. The semantics (busy
//! checks, in-place format conversion, idle-level parking, sync-point
//! signalling) follow the production converter drivers.

use core::cell::RefCell;

use critical_section::Mutex;
use platform::sync::{WaitOutcome, WaitPoint};

use crate::pcm;
use crate::stream::{
    AudioDriver, BufMode, DataBlock, StreamCtx, StreamError, SyncOutcome,
};

fn map_wait(outcome: WaitOutcome) -> SyncOutcome {
    match outcome {
        WaitOutcome::Woken => SyncOutcome::Synced,
        WaitOutcome::Pending => SyncOutcome::Overrun,
        WaitOutcome::Busy => SyncOutcome::Busy,
    }
}

struct OutState {
    ctx: Option<&'static StreamCtx>,
    /// Half currently owned by "hardware" (false = first half).
    hw_half: bool,
    stopping: bool,
    dac_level: u16,
}

/// DAC-style output driver with a hand-cranked DMA interrupt.
pub struct ScriptedOutputDriver {
    state: Mutex<RefCell<OutState>>,
    wait: WaitPoint,
    idle_level: u16,
}

impl ScriptedOutputDriver {
    /// Driver parked at `idle_level`, no stream bound.
    #[must_use]
    pub const fn new(idle_level: u16) -> Self {
        Self {
            state: Mutex::new(RefCell::new(OutState {
                ctx: None,
                hw_half: false,
                stopping: false,
                dac_level: idle_level,
            })),
            wait: WaitPoint::new(),
            idle_level,
        }
    }

    /// Value currently parked on the DAC output register.
    #[must_use]
    pub fn dac_level(&self) -> u16 {
        critical_section::with(|cs| self.state.borrow_ref(cs).dac_level)
    }

    /// `true` while a context is bound and running.
    #[must_use]
    pub fn active(&self) -> bool {
        critical_section::with(|cs| {
            self.state
                .borrow_ref(cs)
                .ctx
                .is_some_and(StreamCtx::running)
        })
    }

    /// Simulate the DMA half/transfer-complete interrupt.
    ///
    /// Linear streams finish; circular streams flip the hardware half
    /// and release the sync waiter, or finish when a stop was requested.
    pub fn pump(&self) {
        let idle = self.idle_level;
        critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            let Some(ctx) = st.ctx else { return };
            if !ctx.running() {
                return;
            }

            match ctx.buf_mode() {
                BufMode::Linear => {
                    // End of transfer: stop the sample clock, park the
                    // DAC, drop running, release the waiter.
                    st.dac_level = idle;
                    ctx.set_running(false);
                }
                BufMode::CircularDouble => {
                    if st.stopping {
                        st.dac_level = idle;
                        ctx.set_running(false);
                    } else {
                        st.hw_half = !st.hw_half;
                    }
                }
            }
        });
        self.wait.signal();
    }
}

impl AudioDriver for ScriptedOutputDriver {
    fn start(&self, ctx: &'static StreamCtx) -> Result<(), StreamError> {
        if ctx.running() {
            return Err(StreamError::Einval);
        }

        critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            if st.ctx.is_some_and(StreamCtx::running) {
                return Err(StreamError::Ebusy);
            }

            ctx.set_running(true);

            // The DAC wants unsigned 12-bit codes; the caller agreed not
            // to touch the buffer while the stream runs, so convert in
            // place.
            // SAFETY: the stream holds the sole lease on the buffer from
            // this point until the stream ends.
            pcm::s16_to_u12(unsafe { ctx.buffer() });

            st.ctx = Some(ctx);
            st.hw_half = false;
            st.stopping = false;
            self.wait.reset();
            Ok(())
        })
    }

    fn data(&self, ctx: &StreamCtx) -> DataBlock {
        match ctx.buf_mode() {
            // Hardware owns one half; the caller gets the other.
            BufMode::CircularDouble => {
                let hw_half = critical_section::with(|cs| self.state.borrow_ref(cs).hw_half);
                ctx.half(!hw_half)
            }
            BufMode::Linear => ctx.block(),
        }
    }

    fn sync(&self, ctx: &StreamCtx, dirty: bool) -> SyncOutcome {
        if !ctx.running() {
            return SyncOutcome::NotRunning;
        }

        if dirty && ctx.buf_mode() == BufMode::CircularDouble {
            // Convert the freshly written half before hardware wraps
            // into it.
            let block = self.data(ctx);
            // SAFETY: the idle half belongs to the caller between sync
            // points; it hands the lease back with this call.
            pcm::s16_to_u12(unsafe { block.as_slice_mut() });
        }

        map_wait(self.wait.wait())
    }

    fn stop(&self, ctx: &StreamCtx) {
        if !ctx.running() {
            return;
        }
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).stopping = true;
        });
    }

    fn terminate(&self, ctx: &StreamCtx) {
        if !ctx.running() {
            return;
        }
        critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            st.dac_level = self.idle_level;
            ctx.set_running(false);
        });
        self.wait.signal();
    }
}

struct ToneHwState {
    ctcss_compare: u8,
    beep_compare: u8,
    ctcss_on: bool,
    beep_on: bool,
    timers_running: bool,
    playback: Option<(usize, u32)>,
}

/// Recording PWM/timer backend for the tone generator.
pub struct ScriptedToneHw {
    state: Mutex<RefCell<ToneHwState>>,
}

impl ScriptedToneHw {
    /// All channels off, timers stopped.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(ToneHwState {
                ctcss_compare: 0,
                beep_compare: 0,
                ctcss_on: false,
                beep_on: false,
                timers_running: false,
                playback: None,
            })),
        }
    }

    /// Last value written to the channel B compare register.
    #[must_use]
    pub fn beep_compare(&self) -> u8 {
        critical_section::with(|cs| self.state.borrow_ref(cs).beep_compare)
    }

    /// Last value written to the channel A compare register.
    #[must_use]
    pub fn ctcss_compare(&self) -> u8 {
        critical_section::with(|cs| self.state.borrow_ref(cs).ctcss_compare)
    }

    /// `(buffer length, sample rate)` of the armed playback, if any.
    #[must_use]
    pub fn playback(&self) -> Option<(usize, u32)> {
        critical_section::with(|cs| self.state.borrow_ref(cs).playback)
    }

    /// `true` while the PWM and tick timers run.
    #[must_use]
    pub fn timers_running(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).timers_running)
    }
}

impl Default for ScriptedToneHw {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::tone::ToneHw for ScriptedToneHw {
    fn set_ctcss_compare(&self, value: u8) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).ctcss_compare = value);
    }

    fn set_beep_compare(&self, value: u8) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).beep_compare = value);
    }

    fn enable_ctcss(&self) {
        critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            st.ctcss_on = true;
            st.timers_running = true;
        });
    }

    fn disable_ctcss(&self) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).ctcss_on = false);
    }

    fn enable_beep(&self) {
        critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            st.beep_on = true;
            st.timers_running = true;
        });
    }

    fn disable_beep(&self) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).beep_on = false);
    }

    fn ctcss_enabled(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).ctcss_on)
    }

    fn beep_enabled(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).beep_on)
    }

    fn timers_off(&self) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).timers_running = false);
    }

    fn start_playback(&self, buf: &'static [u16], sample_rate: u32) {
        critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            st.playback = Some((buf.len(), sample_rate));
            st.beep_on = true;
            st.timers_running = true;
        });
    }

    fn stop_playback(&self) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).playback = None);
    }
}

struct InState {
    ctx: Option<&'static StreamCtx>,
    hw_half: bool,
    stopping: bool,
    counter: i16,
}

/// ADC-style input driver filling buffers with a ramp pattern.
pub struct ScriptedInputDriver {
    state: Mutex<RefCell<InState>>,
    wait: WaitPoint,
}

impl ScriptedInputDriver {
    /// Driver with no stream bound.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(InState {
                ctx: None,
                hw_half: false,
                stopping: false,
                counter: 0,
            })),
            wait: WaitPoint::new(),
        }
    }

    /// Simulate one completed acquisition block: fill the hardware-owned
    /// region with the ramp, then raise the sync point.
    pub fn pump(&self) {
        critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            let Some(ctx) = st.ctx else { return };
            if !ctx.running() {
                return;
            }

            let block = match ctx.buf_mode() {
                BufMode::CircularDouble => ctx.half(st.hw_half),
                BufMode::Linear => ctx.block(),
            };
            // SAFETY: the hardware-owned region is not visible to the
            // caller until the flip below.
            let samples = unsafe { block.as_slice_mut() };
            for s in samples {
                *s = st.counter;
                st.counter = st.counter.wrapping_add(1);
            }

            match ctx.buf_mode() {
                BufMode::Linear => ctx.set_running(false),
                BufMode::CircularDouble => {
                    if st.stopping {
                        ctx.set_running(false);
                    } else {
                        st.hw_half = !st.hw_half;
                    }
                }
            }
        });
        self.wait.signal();
    }
}

impl Default for ScriptedInputDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDriver for ScriptedInputDriver {
    fn start(&self, ctx: &'static StreamCtx) -> Result<(), StreamError> {
        if ctx.running() {
            return Err(StreamError::Einval);
        }
        critical_section::with(|cs| {
            let mut st = self.state.borrow_ref_mut(cs);
            if st.ctx.is_some_and(StreamCtx::running) {
                return Err(StreamError::Ebusy);
            }
            ctx.set_running(true);
            st.ctx = Some(ctx);
            st.hw_half = false;
            st.stopping = false;
            self.wait.reset();
            Ok(())
        })
    }

    fn data(&self, ctx: &StreamCtx) -> DataBlock {
        match ctx.buf_mode() {
            // The caller reads the half hardware just left.
            BufMode::CircularDouble => {
                let hw_half = critical_section::with(|cs| self.state.borrow_ref(cs).hw_half);
                ctx.half(!hw_half)
            }
            BufMode::Linear => ctx.block(),
        }
    }

    fn sync(&self, ctx: &StreamCtx, _dirty: bool) -> SyncOutcome {
        if !ctx.running() {
            return SyncOutcome::NotRunning;
        }
        map_wait(self.wait.wait())
    }

    fn stop(&self, ctx: &StreamCtx) {
        if !ctx.running() {
            return;
        }
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).stopping = true;
        });
    }

    fn terminate(&self, ctx: &StreamCtx) {
        if !ctx.running() {
            return;
        }
        ctx.set_running(false);
        self.wait.signal();
    }
}
