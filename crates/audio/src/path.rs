//! Audio sources, sinks and the path compatibility matrix.

/// Where an audio path takes its samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    /// Microphone input.
    Mic = 0,
    /// Receive audio from the transceiver stage.
    Rtx = 1,
    /// Samples produced by the MCU from a memory buffer.
    Mcu = 2,
}

/// Where an audio path delivers its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sink {
    /// Loudspeaker output.
    Spk = 0,
    /// Transmit audio into the transceiver stage.
    Rtx = 1,
    /// Samples captured into a memory buffer on the MCU.
    Mcu = 2,
}

/// An audio path: one source feeding one sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Path {
    /// Input endpoint.
    pub source: Source,
    /// Output endpoint.
    pub sink: Sink,
}

impl Path {
    /// Build a path.
    #[must_use]
    pub const fn new(source: Source, sink: Sink) -> Self {
        Self { source, sink }
    }

    /// Row/column index of this path in the compatibility matrix.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.source as usize) * 3 + (self.sink as usize)
    }
}

/// Which paths may be open simultaneously.
///
/// Indexed by [`Path::index`] on both axes. The matrix is symmetric and
/// its diagonal is zero: a path never coexists with itself, and two paths
/// sharing a source or a sink are mutually exclusive because they would
/// fight over the same analog stage.
const PATH_COMPATIBILITY_MATRIX: [[u8; 9]; 9] = [
    // MIC-SPK MIC-RTX MIC-MCU RTX-SPK RTX-RTX RTX-MCU MCU-SPK MCU-RTX MCU-MCU
    [0, 0, 0, 0, 1, 1, 0, 0, 1], // MIC-SPK
    [0, 0, 0, 1, 0, 1, 1, 0, 1], // MIC-RTX
    [0, 0, 0, 1, 1, 0, 1, 1, 0], // MIC-MCU
    [0, 1, 1, 0, 0, 0, 0, 1, 1], // RTX-SPK
    [1, 0, 1, 0, 0, 0, 1, 0, 1], // RTX-RTX
    [1, 1, 0, 0, 0, 0, 1, 1, 0], // RTX-MCU
    [0, 1, 1, 0, 1, 1, 0, 0, 0], // MCU-SPK
    [0, 0, 1, 1, 0, 1, 0, 0, 0], // MCU-RTX
    [1, 1, 0, 1, 1, 0, 0, 0, 0], // MCU-MCU
];

/// `true` when `p1` and `p2` may be open at the same time.
///
/// Read-only and side-effect free; the matrix is the single source of
/// truth, callers never reason about sources and sinks individually.
#[must_use]
pub fn check_compatibility(p1: Path, p2: Path) -> bool {
    PATH_COMPATIBILITY_MATRIX[p1.index()][p2.index()] == 1
}
