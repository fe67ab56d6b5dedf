//! DMA audio stream runtime.
//!
//! A stream moves signed 16-bit PCM between a memory buffer and one end
//! of an audio path. The hardware work is behind the [`AudioDriver`]
//! op-table (one driver instance per physical converter) while this
//! module owns stream identities, the path-to-driver mapping and the
//! buffer lifecycle.
//!
//! Two buffer disciplines exist:
//!
//! - [`BufMode::Linear`]: the buffer is transferred exactly once and the
//!   stream goes idle; `sync` returns at the end of the transfer.
//! - [`BufMode::CircularDouble`]: the buffer is two halves cycled
//!   through forever; a sync point fires at each half boundary and the
//!   caller refills the half the hardware is not touching.
//!
//! Output buffers may be transformed in place to the converter's native
//! format at start; the caller is contracted not to touch the buffer
//! while the stream runs.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use thiserror_no_std::Error;

use crate::path::{Path, Sink, Source};

/// Sample type of every stream buffer.
pub type StreamSample = i16;

/// Highest number of concurrently open streams.
pub const MAX_STREAMS: usize = 4;

/// Stream errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// Bad buffer, rate or state for this operation.
    #[error("invalid stream parameter")]
    Einval,
    /// Driver already busy with another context, or no stream slot free.
    #[error("stream resource busy")]
    Ebusy,
    /// No driver registered for the requested endpoint.
    #[error("no driver for endpoint")]
    Unsup,
}

/// Buffer handling discipline of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufMode {
    /// One-shot transfer; the stream idles at the end of the buffer.
    Linear,
    /// Double-buffered circular transfer; never stops by itself.
    CircularDouble,
}

/// Transfer direction of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamMode {
    /// Capture from a source into the buffer.
    Input,
    /// Play the buffer into a sink.
    Output,
}

/// Result of a synchronisation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncOutcome {
    /// The caller blocked until the sync point.
    Synced,
    /// A sync point had already passed since the last call; the caller
    /// missed a refill window.
    Overrun,
    /// The stream is not running.
    NotRunning,
    /// Another thread already waits on this stream.
    Busy,
}

/// Handle of an open stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamId(u8);

/// A chunk of sample memory handed across the driver boundary.
///
/// An empty block stands for "nothing available": a stopped stream, a
/// busy sync point, or the idle half of a linear stream.
#[derive(Debug, Clone, Copy)]
pub struct DataBlock {
    ptr: *mut StreamSample,
    len: usize,
}

impl DataBlock {
    /// Block with no data.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ptr: core::ptr::null_mut(),
            len: 0,
        }
    }

    /// Block over `len` samples at `ptr`.
    #[must_use]
    pub const fn new(ptr: *mut StreamSample, len: usize) -> Self {
        Self { ptr, len }
    }

    /// `true` when the block carries no data.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0 || self.ptr.is_null()
    }

    /// Number of samples in the block.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// View the block as a sample slice.
    ///
    /// # Safety
    ///
    /// The caller must be the only party touching this region until the
    /// reference is dropped; for stream blocks that means between two
    /// sync points.
    #[must_use]
    pub unsafe fn as_slice_mut<'b>(&self) -> &'b mut [StreamSample] {
        if self.is_empty() {
            &mut []
        } else {
            // SAFETY: non-null and sized per the constructor; exclusivity
            // is the caller's obligation stated above.
            unsafe { core::slice::from_raw_parts_mut(self.ptr, self.len) }
        }
    }
}

#[derive(Clone, Copy)]
struct CtxCfg {
    buf: *mut StreamSample,
    len: usize,
    mode: BufMode,
    sample_rate: u32,
}

/// Shared state of one stream, visible to the driver and its interrupt
/// handlers.
pub struct StreamCtx {
    cfg: Mutex<RefCell<CtxCfg>>,
    running: AtomicBool,
}

// SAFETY: the raw buffer pointer refers to memory leased to the stream
// for its whole lifetime (the facade takes it by `&'static mut`), and
// every mutable access path is serialised by the driver contract.
unsafe impl Send for StreamCtx {}
// SAFETY: as above; interior mutability is behind critical sections and
// atomics.
unsafe impl Sync for StreamCtx {}

impl StreamCtx {
    const fn new() -> Self {
        Self {
            cfg: Mutex::new(RefCell::new(CtxCfg {
                buf: core::ptr::null_mut(),
                len: 0,
                mode: BufMode::Linear,
                sample_rate: 0,
            })),
            running: AtomicBool::new(false),
        }
    }

    fn configure(&self, buf: &'static mut [StreamSample], mode: BufMode, sample_rate: u32) {
        critical_section::with(|cs| {
            *self.cfg.borrow_ref_mut(cs) = CtxCfg {
                buf: buf.as_mut_ptr(),
                len: buf.len(),
                mode,
                sample_rate,
            };
        });
    }

    /// `true` while a transfer is armed or in flight.
    #[must_use]
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flip the running flag. Drivers set it under their start critical
    /// section and clear it from the end-of-transfer interrupt.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Buffer handling discipline.
    #[must_use]
    pub fn buf_mode(&self) -> BufMode {
        critical_section::with(|cs| self.cfg.borrow_ref(cs).mode)
    }

    /// Sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        critical_section::with(|cs| self.cfg.borrow_ref(cs).sample_rate)
    }

    /// Buffer length in samples.
    #[must_use]
    pub fn buf_len(&self) -> usize {
        critical_section::with(|cs| self.cfg.borrow_ref(cs).len)
    }

    /// The whole sample buffer.
    ///
    /// # Safety
    ///
    /// Only one party may hold this view at a time; drivers use it for
    /// in-place format conversion before arming the transfer.
    #[must_use]
    pub unsafe fn buffer<'b>(&self) -> &'b mut [StreamSample] {
        let cfg = critical_section::with(|cs| *self.cfg.borrow_ref(cs));
        if cfg.buf.is_null() {
            return &mut [];
        }
        // SAFETY: pointer and length come from the leased buffer; see
        // the function contract.
        unsafe { core::slice::from_raw_parts_mut(cfg.buf, cfg.len) }
    }

    /// One half of the buffer, for circular double-buffer streams.
    #[must_use]
    pub fn half(&self, second: bool) -> DataBlock {
        let cfg = critical_section::with(|cs| *self.cfg.borrow_ref(cs));
        if cfg.buf.is_null() {
            return DataBlock::empty();
        }
        let half = cfg.len / 2;
        let ptr = if second {
            // SAFETY: `half` stays within the leased buffer.
            unsafe { cfg.buf.add(half) }
        } else {
            cfg.buf
        };
        DataBlock::new(ptr, half)
    }

    /// The whole buffer as a [`DataBlock`].
    #[must_use]
    pub fn block(&self) -> DataBlock {
        let cfg = critical_section::with(|cs| *self.cfg.borrow_ref(cs));
        DataBlock::new(cfg.buf, cfg.len)
    }
}

/// Driver op-table: the contract every sample converter implements.
///
/// One value of this trait stands for one hardware instance (one DAC
/// channel, one ADC). `start`/`data`/`stop`/`terminate` never suspend;
/// `sync` blocks the calling thread until the next sync point.
/// Drivers are shared with their own interrupt handlers, hence `Sync`.
pub trait AudioDriver: Sync {
    /// Arm a transfer for `ctx`.
    ///
    /// Must reject a context that is already running (`Einval`) and a
    /// driver instance that is busy with another context (`Ebusy`). On
    /// success the context is marked running before the hardware is
    /// armed, and the buffer may have been converted in place to the
    /// converter's native sample format.
    ///
    /// # Errors
    ///
    /// `Einval`, `Ebusy` as above.
    fn start(&self, ctx: &'static StreamCtx) -> Result<(), StreamError>;

    /// The buffer region the caller may currently touch: the idle half
    /// in circular mode, the whole buffer in linear mode.
    fn data(&self, ctx: &StreamCtx) -> DataBlock;

    /// Block until the next sync point.
    ///
    /// With `dirty` set on a circular stream, the driver converts the
    /// freshly refilled idle half to its native format *before* waiting,
    /// so the conversion is done by the time hardware wraps into it.
    fn sync(&self, ctx: &StreamCtx, dirty: bool) -> SyncOutcome;

    /// Graceful shutdown: hardware drains the current sub-block and the
    /// stream idles at the next sync point. Callable from any context.
    fn stop(&self, ctx: &StreamCtx);

    /// Immediate abort: cut the transfer clock and DMA unconditionally.
    /// Buffer contents are unspecified afterwards.
    fn terminate(&self, ctx: &StreamCtx);
}

/// Registration of one converter at one endpoint.
pub struct AudioDevice<E: 'static> {
    /// The endpoint this converter serves.
    pub endpoint: E,
    /// Driver instance, or `None` for endpoints with no converter of
    /// their own (memory endpoints).
    pub driver: Option<&'static dyn AudioDriver>,
}

struct Slot {
    ctx: StreamCtx,
    busy: AtomicBool,
    driver: Mutex<RefCell<Option<&'static dyn AudioDriver>>>,
}

impl Slot {
    const fn new() -> Self {
        Self {
            ctx: StreamCtx::new(),
            busy: AtomicBool::new(false),
            driver: Mutex::new(RefCell::new(None)),
        }
    }
}

/// Stream registry and facade.
///
/// Owns the path-to-driver mapping and [`MAX_STREAMS`] stream slots.
/// Lives in a `static`: drivers keep references to the embedded stream
/// contexts from interrupt context.
pub struct AudioStreams {
    inputs: &'static [AudioDevice<Source>],
    outputs: &'static [AudioDevice<Sink>],
    slots: [Slot; MAX_STREAMS],
}

impl AudioStreams {
    const INIT_SLOT: Slot = Slot::new();

    /// Build a facade over the board's converter tables.
    #[must_use]
    pub const fn new(
        inputs: &'static [AudioDevice<Source>],
        outputs: &'static [AudioDevice<Sink>],
    ) -> Self {
        Self {
            inputs,
            outputs,
            slots: [Self::INIT_SLOT; MAX_STREAMS],
        }
    }

    fn driver_for(
        &self,
        path: Path,
        direction: StreamMode,
    ) -> Result<&'static dyn AudioDriver, StreamError> {
        let driver = match direction {
            StreamMode::Input => self
                .inputs
                .iter()
                .find(|d| d.endpoint == path.source)
                .and_then(|d| d.driver),
            StreamMode::Output => self
                .outputs
                .iter()
                .find(|d| d.endpoint == path.sink)
                .and_then(|d| d.driver),
        };
        driver.ok_or(StreamError::Unsup)
    }

    fn slot(&self, id: StreamId) -> Result<&Slot, StreamError> {
        let slot = self
            .slots
            .get(id.0 as usize)
            .ok_or(StreamError::Einval)?;
        if !slot.busy.load(Ordering::Acquire) {
            return Err(StreamError::Einval);
        }
        Ok(slot)
    }

    fn slot_driver(slot: &Slot) -> Result<&'static dyn AudioDriver, StreamError> {
        critical_section::with(|cs| *slot.driver.borrow_ref(cs)).ok_or(StreamError::Einval)
    }

    /// Open a stream over `path` and arm its first transfer.
    ///
    /// The buffer is leased to the stream until `stop`/`terminate`; for
    /// output streams the caller must not touch it while the stream
    /// runs. Circular mode requires an even number of samples.
    ///
    /// # Errors
    ///
    /// `Einval` for an empty buffer, a zero sample rate or an odd
    /// circular buffer; `Unsup` when the endpoint has no converter;
    /// `Ebusy` when no slot is free or the converter is taken.
    pub fn start(
        &'static self,
        path: Path,
        direction: StreamMode,
        buf: &'static mut [StreamSample],
        sample_rate: u32,
        mode: BufMode,
    ) -> Result<StreamId, StreamError> {
        if buf.is_empty() || sample_rate == 0 {
            return Err(StreamError::Einval);
        }
        if mode == BufMode::CircularDouble && buf.len() % 2 != 0 {
            return Err(StreamError::Einval);
        }

        let driver = self.driver_for(path, direction)?;

        let (index, slot) = self
            .slots
            .iter()
            .enumerate()
            .find(|(_, s)| {
                s.busy
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            })
            .ok_or(StreamError::Ebusy)?;

        slot.ctx.configure(buf, mode, sample_rate);

        if let Err(e) = driver.start(&slot.ctx) {
            slot.busy.store(false, Ordering::Release);
            return Err(e);
        }

        critical_section::with(|cs| {
            *slot.driver.borrow_ref_mut(cs) = Some(driver);
        });

        Ok(StreamId(index as u8))
    }

    /// Wait for the next chunk of captured data on an input stream.
    ///
    /// Blocks until the sync point, then returns the readable region.
    /// Returns an empty block when another thread is already waiting on
    /// the stream or the stream has stopped.
    ///
    /// # Errors
    ///
    /// `Einval` for a stale stream id.
    pub fn input_data(&self, id: StreamId) -> Result<DataBlock, StreamError> {
        let slot = self.slot(id)?;
        let driver = Self::slot_driver(slot)?;

        match driver.sync(&slot.ctx, false) {
            SyncOutcome::Synced | SyncOutcome::Overrun => Ok(driver.data(&slot.ctx)),
            SyncOutcome::NotRunning | SyncOutcome::Busy => Ok(DataBlock::empty()),
        }
    }

    /// The half of an output stream's buffer not currently being read
    /// by hardware. Empty for linear streams.
    ///
    /// # Errors
    ///
    /// `Einval` for a stale stream id.
    pub fn idle_buffer(&self, id: StreamId) -> Result<DataBlock, StreamError> {
        let slot = self.slot(id)?;
        if slot.ctx.buf_mode() == BufMode::Linear {
            return Ok(DataBlock::empty());
        }
        let driver = Self::slot_driver(slot)?;
        Ok(driver.data(&slot.ctx))
    }

    /// Synchronise with the stream's transfer.
    ///
    /// Set `dirty` after refilling the idle half of a circular output
    /// stream so the driver converts it before hardware wraps around.
    ///
    /// # Errors
    ///
    /// `Einval` for a stale stream id.
    pub fn sync(&self, id: StreamId, dirty: bool) -> Result<SyncOutcome, StreamError> {
        let slot = self.slot(id)?;
        if !slot.ctx.running() {
            return Ok(SyncOutcome::NotRunning);
        }
        let driver = Self::slot_driver(slot)?;
        Ok(driver.sync(&slot.ctx, dirty))
    }

    /// Request a graceful stop and block until the hardware has drained,
    /// then release the stream slot.
    ///
    /// # Errors
    ///
    /// `Einval` for a stale stream id.
    pub fn stop(&self, id: StreamId) -> Result<(), StreamError> {
        let slot = self.slot(id)?;
        let driver = Self::slot_driver(slot)?;

        driver.stop(&slot.ctx);
        while slot.ctx.running() {
            if driver.sync(&slot.ctx, false) == SyncOutcome::Busy {
                break;
            }
        }
        Self::release(slot);
        Ok(())
    }

    /// Abort immediately and release the stream slot. The buffer may
    /// hold arbitrary values afterwards.
    ///
    /// # Errors
    ///
    /// `Einval` for a stale stream id.
    pub fn terminate(&self, id: StreamId) -> Result<(), StreamError> {
        let slot = self.slot(id)?;
        let driver = Self::slot_driver(slot)?;

        driver.terminate(&slot.ctx);
        Self::release(slot);
        Ok(())
    }

    fn release(slot: &Slot) {
        critical_section::with(|cs| {
            *slot.driver.borrow_ref_mut(cs) = None;
        });
        slot.busy.store(false, Ordering::Release);
    }
}
