//! Whole-substrate bring-up and cross-layer scenarios.

#![allow(clippy::unwrap_used)]

use audio::mocks::{ScriptedOutputDriver, ScriptedToneHw};
use audio::{AudioDevice, AudioStreams, BufMode, Path, Sink, Source, StreamMode};
use embedded_hal::delay::DelayNs;
use firmware::board::{pins, GpioRouteHook};
use firmware::Substrate;
use platform::GpioPort;
use memory::{MemError, SegmentList, PADDING_NONE};
use platform::mocks::MockPort;
use platform::Mode;

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

struct Rig {
    substrate: Substrate<GpioRouteHook, NoDelay, ScriptedToneHw>,
    port: &'static MockPort<8>,
    dac: &'static ScriptedOutputDriver,
}

fn rig() -> Rig {
    let segments: &'static SegmentList = Box::leak(Box::new(SegmentList::new()));
    let heap: &'static mut [u8] = Box::leak(Box::new([0u8; 4096]));
    let port: &'static MockPort<8> = Box::leak(Box::new(MockPort::new()));
    let dac: &'static ScriptedOutputDriver =
        Box::leak(Box::new(ScriptedOutputDriver::new(2048)));

    let inputs: &'static [AudioDevice<Source>] = Box::leak(Box::new([AudioDevice {
        endpoint: Source::Mcu,
        driver: None,
    }]));
    let outputs: &'static [AudioDevice<Sink>] = Box::leak(Box::new([AudioDevice {
        endpoint: Sink::Spk,
        driver: Some(dac),
    }]));
    let streams: &'static AudioStreams =
        Box::leak(Box::new(AudioStreams::new(inputs, outputs)));

    let substrate = Substrate::bring_up(
        segments,
        heap,
        streams,
        GpioRouteHook::new(port),
        NoDelay,
        ScriptedToneHw::new(),
    )
    .unwrap();

    Rig { substrate, port, dac }
}

#[test]
fn boot_leaves_the_audio_section_parked() {
    let r = rig();
    // Speaker muted, amplifier off, mic unpowered: the quiet boot state.
    assert!(r.port.read(pins::SPK_MUTE));
    assert!(!r.port.read(pins::AUDIO_AMP_EN));
    assert!(!r.port.read(pins::MIC_PWR));
    assert_eq!(r.port.mode_of(pins::BEEP_OUT), Some(Mode::Input));
}

#[test]
fn heap_segment_serves_the_runtime() {
    let r = rig();

    let a = r
        .substrate
        .segments
        .alloc(r.substrate.heap, Some("rx buffer"), 10, 4, PADDING_NONE, None)
        .unwrap();
    let b = r
        .substrate
        .segments
        .alloc(r.substrate.heap, Some("tx buffer"), 20, 8, PADDING_NONE, None)
        .unwrap();
    assert_eq!(a % 4, 0);
    assert_eq!(b % 8, 0);
    assert!(b >= a + 10);

    // Exhaustion reports the missing byte count.
    let mut needed = 0;
    let err = r.substrate.segments.alloc(
        r.substrate.heap,
        None,
        8192,
        1,
        PADDING_NONE,
        Some(&mut needed),
    );
    assert_eq!(err, Err(MemError::SegOvf));
    assert!(needed > 0);
}

#[test]
fn connecting_mcu_to_speaker_sequences_the_board() {
    let mut r = rig();

    r.substrate.router.connect(Source::Mcu, Sink::Spk);
    // Tone line handed to the PWM, amplifier on, speaker unmuted.
    assert_eq!(r.port.mode_of(pins::BEEP_OUT), Some(Mode::Alternate(2)));
    assert!(r.port.read(pins::AUDIO_AMP_EN));
    assert!(!r.port.read(pins::SPK_MUTE));

    r.substrate.router.disconnect(Source::Mcu, Sink::Spk);
    assert!(r.port.read(pins::SPK_MUTE));
    assert!(!r.port.read(pins::AUDIO_AMP_EN));
    assert_eq!(r.port.mode_of(pins::BEEP_OUT), Some(Mode::Input));
}

#[test]
fn playback_flows_once_the_path_is_connected() {
    let mut r = rig();

    r.substrate.router.connect(Source::Mcu, Sink::Spk);

    let buf: &'static mut [i16] = Box::leak(Box::new([0i16; 64]));
    let id = r
        .substrate
        .streams
        .start(
            Path::new(Source::Mcu, Sink::Spk),
            StreamMode::Output,
            buf,
            16_000,
            BufMode::Linear,
        )
        .unwrap();

    assert!(r.dac.active());
    r.dac.pump();
    assert!(!r.dac.active());
    assert_eq!(r.dac.dac_level(), 2048);

    r.substrate.streams.stop(id).unwrap();
    r.substrate.router.disconnect(Source::Mcu, Sink::Spk);
}

#[test]
fn tone_engine_is_live_after_boot() {
    let r = rig();

    r.substrate.tones.set_tone_freq(88.5);
    r.substrate.tones.tone_on();
    r.substrate.tones.on_tick();
    assert!(r.substrate.tones.hw().timers_running());

    r.substrate.tones.tone_off();
    r.substrate.tones.on_tick();
    assert!(!r.substrate.tones.hw().timers_running());
}
