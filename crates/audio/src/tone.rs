//! CTCSS, beep and playback tone generation.
//!
//! One PWM timer drives two compare channels: channel A carries the
//! CTCSS sub-audible sine during transmission, channel B carries
//! user-interface beeps or, when locked, DMA-fed audio playback and
//! FSK modulation. A high-rate timer interrupt (8960 Hz) advances two
//! phase accumulators through a 256-entry sine table and refreshes both
//! compare registers; sample playback bypasses the accumulators and
//! feeds channel B straight from a buffer via DMA.
//!
//! The `locked` flag arbitrates channel B: while a playback or FSK
//! transfer owns the channel, every beep entry point (including the
//! tick interrupt's compare write) is gated off, so the transfer's
//! samples are never stomped on.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use platform::sync::{WaitOutcome, WaitPoint};

/// One period of a 35 Hz sine, 256 samples, 8-bit amplitude.
///
/// At the 8960 Hz tick rate the table read out one entry per tick
/// reproduces exactly 35 Hz; the 16.16 accumulator increment scales any
/// other frequency from that base.
pub const SINE_TABLE: [u8; 256] = [
    128, 131, 134, 137, 140, 143, 146, 149, 152, 155, 158, 162, 165, 167, 170, 173, 176, 179,
    182, 185, 188, 190, 193, 196, 198, 201, 203, 206, 208, 211, 213, 215, 218, 220, 222, 224,
    226, 228, 230, 232, 234, 235, 237, 238, 240, 241, 243, 244, 245, 246, 248, 249, 250, 250,
    251, 252, 253, 253, 254, 254, 254, 255, 255, 255, 255, 255, 255, 255, 254, 254, 254, 253,
    253, 252, 251, 250, 250, 249, 248, 246, 245, 244, 243, 241, 240, 238, 237, 235, 234, 232,
    230, 228, 226, 224, 222, 220, 218, 215, 213, 211, 208, 206, 203, 201, 198, 196, 193, 190,
    188, 185, 182, 179, 176, 173, 170, 167, 165, 162, 158, 155, 152, 149, 146, 143, 140, 137,
    134, 131, 128, 124, 121, 118, 115, 112, 109, 106, 103, 100, 97, 93, 90, 88, 85, 82, 79, 76,
    73, 70, 67, 65, 62, 59, 57, 54, 52, 49, 47, 44, 42, 40, 37, 35, 33, 31, 29, 27, 25, 23, 21,
    20, 18, 17, 15, 14, 12, 11, 10, 9, 7, 6, 5, 5, 4, 3, 2, 2, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 1,
    1, 1, 2, 2, 3, 4, 5, 5, 6, 7, 9, 10, 11, 12, 14, 15, 17, 18, 20, 21, 23, 25, 27, 29, 31,
    33, 35, 37, 40, 42, 44, 47, 49, 52, 54, 57, 59, 62, 65, 67, 70, 73, 76, 79, 82, 85, 88, 90,
    93, 97, 100, 103, 106, 109, 112, 115, 118, 121, 124,
];

/// Frequency of the sine stored in the table, in Hz.
const BASE_SINE_FREQ: u32 = 35;

/// Tick interrupt rate of the phase-accumulator timer, in Hz.
pub const TICK_RATE_HZ: u32 = 8960;

/// Hardware behind the tone generator.
///
/// Channel A is the CTCSS output, channel B the beep/playback output.
/// Compare writes and channel switches come from both thread and
/// interrupt context; implementations must tolerate that, hence `Sync`.
pub trait ToneHw: Sync {
    /// Load the channel A compare register.
    fn set_ctcss_compare(&self, value: u8);

    /// Load the channel B compare register.
    fn set_beep_compare(&self, value: u8);

    /// Enable channel A and make sure the PWM and tick timers run.
    fn enable_ctcss(&self);

    /// Disable channel A output. The timers keep running as long as any
    /// channel is enabled.
    fn disable_ctcss(&self);

    /// Enable channel B and make sure the PWM and tick timers run.
    fn enable_beep(&self);

    /// Disable channel B output.
    fn disable_beep(&self);

    /// `true` while channel A is enabled.
    fn ctcss_enabled(&self) -> bool;

    /// `true` while channel B is enabled.
    fn beep_enabled(&self) -> bool;

    /// Stop the PWM and tick timers. Called from the tick interrupt
    /// once both channels are off.
    fn timers_off(&self);

    /// Arm the sample timer and DMA feeding channel B from `buf` at
    /// `sample_rate`. Channel B is enabled by the implementation.
    fn start_playback(&self, buf: &'static [u16], sample_rate: u32);

    /// Cut the sample timer and DMA immediately.
    fn stop_playback(&self);
}

/// Tone, beep and playback engine over a [`ToneHw`] backend.
pub struct ToneGenerator<H: ToneHw> {
    hw: H,
    tone_index: AtomicU32,
    tone_incr: AtomicU32,
    beep_index: AtomicU32,
    beep_incr: AtomicU32,
    beep_ticks: AtomicU32,
    beep_volume: AtomicU8,
    locked: AtomicBool,
    waiter: WaitPoint,
}

impl<H: ToneHw> ToneGenerator<H> {
    /// Engine at rest over `hw`.
    pub const fn new(hw: H) -> Self {
        Self {
            hw,
            tone_index: AtomicU32::new(0),
            tone_incr: AtomicU32::new(0),
            beep_index: AtomicU32::new(0),
            beep_incr: AtomicU32::new(0),
            beep_ticks: AtomicU32::new(0),
            beep_volume: AtomicU8::new(0),
            locked: AtomicBool::new(false),
            waiter: WaitPoint::new(),
        }
    }

    /// Access the hardware backend.
    pub fn hw(&self) -> &H {
        &self.hw
    }

    /// Program the CTCSS frequency.
    ///
    /// Converts to a 16.16 fixed-point table increment relative to the
    /// 35 Hz base sine. Purely computational; takes effect on the next
    /// tick.
    pub fn set_tone_freq(&self, freq_hz: f32) {
        let dividend = freq_hz * 65536.0;
        self.tone_incr
            .store((dividend as u32) / BASE_SINE_FREQ, Ordering::Relaxed);
    }

    /// Enable the CTCSS output.
    pub fn tone_on(&self) {
        self.hw.enable_ctcss();
    }

    /// Disable the CTCSS output. The timers shut down from the tick
    /// interrupt once channel B is also idle.
    pub fn tone_off(&self) {
        self.hw.disable_ctcss();
    }

    /// Start a beep of `freq_hz` at `volume` (0–255).
    ///
    /// `duration_ms == 0` means indefinitely; otherwise the tick
    /// interrupt counts the beep down and disables channel B when time
    /// is up. Silently ignored while playback holds the channel.
    pub fn beep_on(&self, freq_hz: f32, volume: u8, duration_ms: u32) {
        if self.locked.load(Ordering::Acquire) {
            return;
        }

        let dividend = freq_hz * 65536.0;
        self.beep_incr
            .store((dividend as u32) / BASE_SINE_FREQ, Ordering::Relaxed);
        self.beep_volume.store(volume, Ordering::Relaxed);

        // Duration is in milliseconds, the downcounter in ticks.
        self.beep_ticks
            .store((duration_ms * TICK_RATE_HZ) / 1000, Ordering::Relaxed);

        self.hw.enable_beep();
    }

    /// Stop a beep. Silently ignored while playback holds the channel.
    pub fn beep_off(&self) {
        if self.locked.load(Ordering::Acquire) {
            return;
        }
        self.hw.disable_beep();
    }

    /// Take channel B for an external modulator (FSK, PWM sink driver).
    /// Beep entry points and tick writes are gated off until
    /// [`ToneGenerator::unlock_beep`].
    pub fn lock_beep(&self) {
        self.locked.store(true, Ordering::Release);
    }

    /// Give channel B back to the beep generator.
    pub fn unlock_beep(&self) {
        self.locked.store(false, Ordering::Release);
    }

    /// Play a sample buffer through channel B via DMA.
    ///
    /// Locks the channel (preempting any beep in progress), programs the
    /// sample timer to `sample_rate` and arms the transfer. Requests
    /// with an empty buffer or a zero rate are ignored.
    pub fn play_audio_stream(&self, buf: &'static [u16], sample_rate: u32) {
        if buf.is_empty() || sample_rate == 0 {
            return;
        }

        critical_section::with(|_| {
            self.locked.store(true, Ordering::Release);
            self.beep_ticks.store(0, Ordering::Relaxed);
        });
        self.waiter.reset();

        self.hw.start_playback(buf, sample_rate);
    }

    /// Block until the running playback finishes.
    ///
    /// Returns `false` immediately when no transfer is in flight or
    /// another thread already waits; `true` after the transfer
    /// completed.
    pub fn wait_stream_end(&self) -> bool {
        if !self.locked.load(Ordering::Acquire) {
            return false;
        }
        matches!(
            self.waiter.wait(),
            WaitOutcome::Woken | WaitOutcome::Pending
        )
    }

    /// Abort a running playback: cut DMA and the sample timer, idle
    /// channel B, unlock, release the waiter.
    pub fn stop_audio_stream(&self) {
        critical_section::with(|_| {
            self.hw.stop_playback();
            self.hw.disable_beep();
            self.locked.store(false, Ordering::Release);
        });
        self.waiter.signal();
    }

    /// `true` while channel B is in use, by beep or playback alike.
    pub fn tone_busy(&self) -> bool {
        self.hw.beep_enabled()
    }

    /// Shut the engine down: cut any playback transfer, disable both
    /// compare channels, stop the timers, unlock and release a pending
    /// waiter.
    ///
    /// Timer/GPIO bring-up is the [`ToneHw`] backend's job; this is the
    /// engine-level half of the shutdown, safe to call in any state.
    pub fn terminate(&self) {
        critical_section::with(|_| {
            self.hw.stop_playback();
            self.hw.disable_ctcss();
            self.hw.disable_beep();
            self.hw.timers_off();
            self.beep_ticks.store(0, Ordering::Relaxed);
            self.locked.store(false, Ordering::Release);
        });
        self.waiter.signal();
    }

    /// Tick interrupt body, to be called at [`TICK_RATE_HZ`].
    ///
    /// Advances both phase accumulators, refreshes the compare
    /// registers, times out the beep and shuts the timers down once
    /// both channels are idle.
    pub fn on_tick(&self) {
        let tone = self
            .tone_index
            .load(Ordering::Relaxed)
            .wrapping_add(self.tone_incr.load(Ordering::Relaxed));
        self.tone_index.store(tone, Ordering::Relaxed);

        let beep = self
            .beep_index
            .load(Ordering::Relaxed)
            .wrapping_add(self.beep_incr.load(Ordering::Relaxed));
        self.beep_index.store(beep, Ordering::Relaxed);

        self.hw
            .set_ctcss_compare(SINE_TABLE[((tone >> 16) & 0xFF) as usize]);

        if !self.locked.load(Ordering::Acquire) {
            let sample = SINE_TABLE[((beep >> 16) & 0xFF) as usize] as u32;
            let volume = self.beep_volume.load(Ordering::Relaxed) as u32;
            self.hw.set_beep_compare(((sample * volume) >> 8) as u8);
        }

        let ticks = self.beep_ticks.load(Ordering::Relaxed);
        if ticks > 0 {
            let ticks = ticks - 1;
            self.beep_ticks.store(ticks, Ordering::Relaxed);
            if ticks == 0 {
                self.hw.disable_beep();
            }
        }

        if !self.hw.ctcss_enabled() && !self.hw.beep_enabled() {
            self.hw.timers_off();
        }
    }

    /// Playback end-of-transfer interrupt body.
    ///
    /// Stops the sample timer, idles channel B, unlocks and wakes the
    /// thread pending in [`ToneGenerator::wait_stream_end`].
    pub fn on_playback_complete(&self) {
        self.hw.stop_playback();
        self.hw.disable_beep();
        self.locked.store(false, Ordering::Release);
        self.waiter.signal();
    }
}
