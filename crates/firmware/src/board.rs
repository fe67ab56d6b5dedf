//! Board wiring: GPIO roles and the audio route hook.
//!
//! Pin numbers follow the schematic net names of the MD-3x0 class
//! boards. Everything routes through the [`platform::GpioPort`]
//! capability set, so the same hook drives native pins on hardware and
//! the logic-level double in hosted tests.

use audio::route::RouteHook;
use platform::gpio::{GpioPort, Mode, PinRef};

/// GPIO roles of the audio section.
pub mod pins {
    /// Speaker mute switch, active high.
    pub const SPK_MUTE: u8 = 0;
    /// Audio power amplifier enable.
    pub const AUDIO_AMP_EN: u8 = 1;
    /// Microphone preamplifier supply.
    pub const MIC_PWR: u8 = 2;
    /// Receiver AF output stage enable.
    pub const RX_AF_EN: u8 = 3;
    /// Tone/PWM output into the AF chain.
    pub const BEEP_OUT: u8 = 4;
}

/// Alternate function of the PWM timer on the beep output pin.
const BEEP_OUT_AF: u8 = 2;

/// Audio route hook driving the board's analog control pins.
pub struct GpioRouteHook {
    spk_mute: PinRef<'static>,
    amp_en: PinRef<'static>,
    mic_pwr: PinRef<'static>,
    af_en: PinRef<'static>,
    beep_out: PinRef<'static>,
}

impl GpioRouteHook {
    /// Hook over the board's GPIO bank.
    #[must_use]
    pub const fn new(port: &'static dyn GpioPort) -> Self {
        Self {
            spk_mute: PinRef { port, pin: pins::SPK_MUTE },
            amp_en: PinRef { port, pin: pins::AUDIO_AMP_EN },
            mic_pwr: PinRef { port, pin: pins::MIC_PWR },
            af_en: PinRef { port, pin: pins::RX_AF_EN },
            beep_out: PinRef { port, pin: pins::BEEP_OUT },
        }
    }
}

impl RouteHook for GpioRouteHook {
    fn mic_power(&mut self, on: bool) {
        if on {
            self.mic_pwr.set();
        } else {
            self.mic_pwr.clear();
        }
    }

    fn af_output(&mut self, on: bool) {
        if on {
            self.af_en.set();
        } else {
            self.af_en.clear();
        }
    }

    fn amp_enable(&mut self, on: bool) {
        if on {
            self.amp_en.set();
        } else {
            self.amp_en.clear();
        }
    }

    fn speaker_mute(&mut self, muted: bool) {
        if muted {
            self.spk_mute.set();
        } else {
            self.spk_mute.clear();
        }
    }

    fn beep_line(&mut self, connected: bool) {
        // The tone line is handed to the PWM timer while connected and
        // parked high-impedance otherwise. Ports without mode support
        // (shift registers never carry this line) are left alone.
        let mode = if connected {
            Mode::Alternate(BEEP_OUT_AF)
        } else {
            Mode::Input
        };
        let _ = self.beep_out.mode(mode);
    }
}
