//! Substrate bring-up.
//!
//! Boot proceeds strictly bottom-up: the memory segments come first so
//! every later stage can allocate, then the non-volatile areas, then
//! GPIO-backed routing, and the audio layer last. The [`Substrate`]
//! value holds the assembled runtime the application and UI code run
//! on.

use audio::route::{RouteHook, Router};
use audio::stream::AudioStreams;
use audio::tone::{ToneGenerator, ToneHw};
use embedded_hal::delay::DelayNs;
use memory::{MemError, SegmentId, SegmentList, PADDING_NONE};

/// The assembled runtime substrate.
pub struct Substrate<H: RouteHook, D: DelayNs, T: ToneHw> {
    /// Process-wide segment registry.
    pub segments: &'static SegmentList,
    /// General-purpose heap segment, created first at boot.
    pub heap: SegmentId,
    /// Stream registry over the board's converter tables.
    pub streams: &'static AudioStreams,
    /// Electrical path router.
    pub router: Router<H, D>,
    /// Tone, beep and CTCSS engine.
    pub tones: ToneGenerator<T>,
}

impl<H: RouteHook, D: DelayNs, T: ToneHw> Substrate<H, D, T> {
    /// Bring the substrate up in dependency order.
    ///
    /// Creates the heap segment over `heap_storage`, parks the audio
    /// routing in its muted boot state and hands back the assembled
    /// runtime. The caller provides the statics (segment registry and
    /// stream facade) because interrupt handlers keep references into
    /// them for the lifetime of the firmware.
    ///
    /// # Errors
    ///
    /// Propagates heap segment creation failures.
    pub fn bring_up(
        segments: &'static SegmentList,
        heap_storage: &'static mut [u8],
        streams: &'static AudioStreams,
        hook: H,
        delay: D,
        tone_hw: T,
    ) -> Result<Self, MemError> {
        let heap = segments.create_backed(Some("Heap"), heap_storage, PADDING_NONE)?;

        let mut router = Router::new(hook, delay);
        router.init();

        let tones = ToneGenerator::new(tone_hw);

        Ok(Self {
            segments,
            heap,
            streams,
            router,
            tones,
        })
    }
}
