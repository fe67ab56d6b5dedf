//! Electrical routing of audio paths.
//!
//! Connecting a path does not move a single sample: it powers the right
//! analog stages and orders the mute edges so nothing pops. The
//! board-specific work hides behind [`RouteHook`]; the sequencing rules
//! live here and are the same on every target:
//!
//! - speaker on: enable the amplifier first, wait at least 10 ms, then
//!   unmute, so the amplifier settles while the mute still shorts the AF
//!   line;
//! - speaker off: mute first, then drop the amplifier.

use embedded_hal::delay::DelayNs;

use crate::path::{Sink, Source};

/// Milliseconds between amplifier enable and speaker unmute.
const ANTI_POP_DELAY_MS: u32 = 10;

/// Board-specific electrical actions behind the router.
///
/// Implementations flip GPIOs, write codec registers or poke the
/// baseband chip; they do not sequence anything themselves.
pub trait RouteHook {
    /// Microphone bias / preamplifier supply.
    fn mic_power(&mut self, on: bool);

    /// AF output stage of the receiver chain.
    fn af_output(&mut self, on: bool);

    /// Audio power amplifier enable line.
    fn amp_enable(&mut self, on: bool);

    /// Speaker mute switch. `true` shorts the speaker line.
    fn speaker_mute(&mut self, muted: bool);

    /// Connect or high-Z the MCU tone/PWM line into the AF chain.
    fn beep_line(&mut self, connected: bool);
}

/// Sequencer turning `(source, sink)` pairs into ordered hook calls.
pub struct Router<H, D> {
    hook: H,
    delay: D,
}

impl<H: RouteHook, D: DelayNs> Router<H, D> {
    /// Build a router over a board hook and a delay provider.
    pub const fn new(hook: H, delay: D) -> Self {
        Self { hook, delay }
    }

    /// Park every stage: speaker muted, amplifier off, mic unpowered,
    /// tone line detached. The state boot leaves the board in.
    pub fn init(&mut self) {
        self.hook.speaker_mute(true);
        self.hook.amp_enable(false);
        self.hook.mic_power(false);
        self.hook.beep_line(false);
    }

    /// Make the analog path viable. Stream lifecycle is separate.
    pub fn connect(&mut self, source: Source, sink: Sink) {
        match (source, sink) {
            (Source::Mic, _) => self.hook.mic_power(true),
            (Source::Rtx, Sink::Spk) => self.hook.af_output(true),
            (Source::Mcu, Sink::Spk) | (Source::Mcu, Sink::Rtx) => {
                self.hook.beep_line(true);
            }
            _ => {}
        }

        if sink == Sink::Spk {
            // Anti-pop: unmute no earlier than 10 ms after amplifier
            // power-on.
            self.hook.amp_enable(true);
            self.delay.delay_ms(ANTI_POP_DELAY_MS);
            self.hook.speaker_mute(false);
        }
    }

    /// Undo [`Router::connect`], muting before anything powers down.
    pub fn disconnect(&mut self, source: Source, sink: Sink) {
        if sink == Sink::Spk {
            self.hook.speaker_mute(true);
            self.hook.amp_enable(false);
        }

        match (source, sink) {
            (Source::Mic, _) => self.hook.mic_power(false),
            (Source::Rtx, Sink::Spk) => self.hook.af_output(false),
            (Source::Mcu, Sink::Spk) | (Source::Mcu, Sink::Rtx) => {
                self.hook.beep_line(false);
            }
            _ => {}
        }
    }

    /// Access the board hook, for state queries in tests and shutdown
    /// paths.
    pub fn hook(&self) -> &H {
        &self.hook
    }
}
