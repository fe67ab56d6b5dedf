//! Audio path management, streaming and tone generation.
//!
//! Three layers, from the connector inwards:
//!
//! - [`path`] and [`route`]: which `(source, sink)` pairs may be live at
//!   the same time, and the electrical work (mic bias, amplifier, mutes)
//!   of opening or closing one. Routing never moves samples.
//! - [`stream`]: DMA-driven sample transport over an opened path, in
//!   one-shot linear or double-buffered circular mode, with
//!   suspension-based synchronisation against the transfer interrupts.
//! - [`tone`]: the CTCSS/beep generator sharing one PWM output between a
//!   sub-audible sine, user-interface beeps and DMA-fed playback, with
//!   playback locking the beep channel out.

#![cfg_attr(not(test), no_std)]

pub mod path;
pub mod pcm;
pub mod route;
pub mod stream;
pub mod tone;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use path::{check_compatibility, Path, Sink, Source};
pub use route::{RouteHook, Router};
pub use stream::{
    AudioDevice, AudioDriver, AudioStreams, BufMode, StreamCtx, StreamError, StreamId,
    StreamMode, SyncOutcome,
};
pub use tone::{ToneGenerator, ToneHw};
