//! Caller-owned PCM ring shared between the audio packet path (reader) and
//! the deferred audio refill (writer).
//!
//! `AudioRing` stores interleaved stereo `i16` frames in a slice the
//! application provides. [`AudioRing::split`] hands out a [`RingReader`] for
//! the DMA completion interrupt, which consumes at most four frames per audio
//! packet, and a [`RingWriter`] for the lower-priority refill interrupt, which
//! refills half the ring at a time. The reader may preempt the writer at any
//! point; the two share nothing but the refill handshake.
//!
//! # Handshake
//!
//! ```text
//!          poll_refill           take_request           grant
//!   IDLE ──────────────► POSTED ─────────────► FILLING ───────► GRANTED
//!    ▲      (reader)                (writer)              (writer)  │
//!    └──────────────────────── next read (reader) ◄─────────────────┘
//! ```
//!
//! Every transition is made by exactly one side, so a load followed by a
//! store is enough; no compare-and-swap is needed. A request stays in flight
//! from `poll_refill` until the reader folds its grant in, and no second
//! request is posted before that. The requested region `[write, write + half)`
//! never overlaps the readable region `[read, read + available)`, because a
//! request is only posted when `available <= half`.

use core::marker::PhantomData;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU16, AtomicU8, Ordering};

use thiserror_no_std::Error;

/// Largest ring size in frames.
pub const MAX_FRAMES: usize = u16::MAX as usize;

const IDLE: u8 = 0;
const POSTED: u8 = 1;
const FILLING: u8 = 2;
const GRANTED: u8 = 3;

/// Ring construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingError {
    /// The ring must hold a non-zero multiple of 4 frames.
    #[error("ring size must be a non-zero multiple of 4 frames, got {frames}")]
    BadSize {
        /// Frames the slice holds.
        frames: usize,
    },
    /// The ring is larger than [`MAX_FRAMES`].
    #[error("ring of {frames} frames exceeds {MAX_FRAMES}")]
    TooLarge {
        /// Frames the slice holds.
        frames: usize,
    },
}

/// A refill: `frames` stereo frames starting at frame `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RefillRequest {
    /// First frame to write.
    pub offset: u16,
    /// Frames to write.
    pub frames: u16,
}

/// Refill state visible to both halves.
struct Handshake {
    phase: AtomicU8,
    offset: AtomicU16,
    frames: AtomicU16,
}

impl Handshake {
    const fn new() -> Self {
        Self {
            phase: AtomicU8::new(IDLE),
            offset: AtomicU16::new(0),
            frames: AtomicU16::new(0),
        }
    }

    fn request(&self) -> RefillRequest {
        RefillRequest {
            offset: self.offset.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
        }
    }
}

/// Cursors owned by the reader.
#[derive(Debug, Clone, Copy, Default)]
struct Cursors {
    read: u16,
    write: u16,
    available: u16,
}

/// Raw view of the caller's samples. Both halves hold a copy; the handshake
/// keeps their accesses disjoint.
#[derive(Clone, Copy)]
struct Samples<'a> {
    ptr: NonNull<i16>,
    len: usize,
    _buf: PhantomData<&'a mut [i16]>,
}

impl<'a> Samples<'a> {
    fn new(buf: &'a mut [i16], len: usize) -> Self {
        Self {
            ptr: NonNull::from(buf).cast(),
            len,
            _buf: PhantomData,
        }
    }

    /// Frame at `index`, or silence if it lies outside the buffer.
    ///
    /// # Safety
    ///
    /// No `&mut` handed out by [`region_mut`](Self::region_mut) may cover
    /// the frame while it is read.
    #[allow(clippy::arithmetic_side_effects)] // Safety: index < len / 2 checked before the offset
    unsafe fn frame(&self, index: usize) -> [i16; 2] {
        let i = index * 2;
        if i + 1 >= self.len {
            return [0; 2];
        }
        // SAFETY: i + 1 < len, so both reads are inside the caller's buffer.
        unsafe { [self.ptr.as_ptr().add(i).read(), self.ptr.as_ptr().add(i + 1).read()] }
    }

    /// Samples of `frames` frames starting at frame `offset`.
    ///
    /// # Safety
    ///
    /// The region must not be read through [`frame`](Self::frame) or handed
    /// out again while the returned slice is alive.
    #[allow(clippy::arithmetic_side_effects)] // Safety: u16 values widened to usize, products < 2^18
    unsafe fn region_mut<'r>(&self, request: RefillRequest) -> Option<&'r mut [i16]>
    where
        'a: 'r,
    {
        let start = usize::from(request.offset) * 2;
        let len = usize::from(request.frames) * 2;
        if start + len > self.len {
            return None;
        }
        // SAFETY: start + len <= self.len keeps the slice inside the buffer
        // borrowed for 'a; exclusivity is the caller's contract.
        Some(unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr().add(start), len) })
    }
}

/// Stereo PCM ring over a caller-provided buffer.
pub struct AudioRing<'a> {
    samples: Samples<'a>,
    size: u16,
    half: u16,
    cursors: Cursors,
    handshake: Handshake,
}

// SAFETY: the ring holds the only access to its buffer (borrowed mutably for
// 'a); the raw pointer is never shared outside the halves it splits into.
unsafe impl Send for AudioRing<'_> {}

impl<'a> AudioRing<'a> {
    /// Wrap `buf` (interleaved L/R) as an empty ring.
    ///
    /// A trailing odd sample is ignored.
    ///
    /// # Errors
    ///
    /// Fails if the frame count is zero, not a multiple of 4, or above
    /// [`MAX_FRAMES`].
    #[allow(clippy::arithmetic_side_effects)] // Safety: division by non-zero constants
    pub fn new(buf: &'a mut [i16]) -> Result<Self, RingError> {
        let frames = buf.len() / 2;
        if frames == 0 || frames % 4 != 0 {
            return Err(RingError::BadSize { frames });
        }
        let size = u16::try_from(frames).map_err(|_| RingError::TooLarge { frames })?;
        Ok(Self {
            samples: Samples::new(buf, frames * 2),
            size,
            half: size / 2,
            cursors: Cursors::default(),
            handshake: Handshake::new(),
        })
    }

    /// Forget all content, cursors and any request in flight.
    pub fn reset(&mut self) {
        self.cursors = Cursors::default();
        self.handshake.phase.store(IDLE, Ordering::Relaxed);
    }

    /// Fill the whole ring through `fill(samples, frames)` and make it
    /// readable. Used once before scanout starts.
    pub fn prime(&mut self, fill: impl FnOnce(&mut [i16], usize)) {
        self.reset();
        let all = RefillRequest {
            offset: 0,
            frames: self.size,
        };
        // SAFETY: `&mut self` excludes both halves, so nothing else reads or
        // writes the buffer while `fill` runs.
        if let Some(region) = unsafe { self.samples.region_mut(all) } {
            fill(region, usize::from(self.size));
        }
        self.cursors.available = self.size;
    }

    /// Reader and writer halves. They may be used from different interrupt
    /// priorities.
    pub fn split(&mut self) -> (RingReader<'_>, RingWriter<'_>) {
        (
            RingReader {
                samples: self.samples,
                size: self.size,
                half: self.half,
                cursors: &mut self.cursors,
                handshake: &self.handshake,
            },
            RingWriter {
                samples: self.samples,
                handshake: &self.handshake,
            },
        )
    }

    /// Reader half alone.
    pub fn reader(&mut self) -> RingReader<'_> {
        self.split().0
    }

    /// Writer half alone.
    pub fn writer(&mut self) -> RingWriter<'_> {
        self.split().1
    }

    /// Capacity in frames.
    pub const fn size(&self) -> u16 {
        self.size
    }

    /// Refill watermark and chunk size in frames.
    pub const fn half(&self) -> u16 {
        self.half
    }

    /// Frames the reader may consume, not counting a grant not yet applied.
    pub const fn available(&self) -> u16 {
        self.cursors.available
    }

    /// `true` from the moment a refill is posted until its grant is applied.
    pub fn in_flight(&self) -> bool {
        self.handshake.phase.load(Ordering::Acquire) != IDLE
    }
}

/// Consumer half, used from the DMA completion interrupt.
pub struct RingReader<'r> {
    samples: Samples<'r>,
    size: u16,
    half: u16,
    cursors: &'r mut Cursors,
    handshake: &'r Handshake,
}

// SAFETY: the reader only touches frames in [read, read + available), which
// the handshake keeps disjoint from the writer's in-flight region.
unsafe impl Send for RingReader<'_> {}

impl RingReader<'_> {
    /// Frames the reader may consume, not counting a grant not yet applied.
    pub fn available(&self) -> u16 {
        self.cursors.available
    }

    /// Next frame to read.
    pub fn read_cursor(&self) -> u16 {
        self.cursors.read
    }

    /// First frame after the readable region.
    pub fn write_cursor(&self) -> u16 {
        self.cursors.write
    }

    /// `true` from the moment a refill is posted until its grant is applied.
    pub fn in_flight(&self) -> bool {
        self.handshake.phase.load(Ordering::Acquire) != IDLE
    }

    /// Fold a finished refill into the readable count and the write cursor.
    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)] // Safety: available + frames <= size by the handshake; result of % size fits u16
    fn apply_grant(&mut self) {
        if self.handshake.phase.load(Ordering::Acquire) != GRANTED {
            return;
        }
        let frames = self.handshake.frames.load(Ordering::Relaxed);
        let c = &mut *self.cursors;
        c.available = c.available.saturating_add(frames).min(self.size);
        c.write = ((u32::from(c.write) + u32::from(frames)) % u32::from(self.size)) as u16;
        self.handshake.phase.store(IDLE, Ordering::Release);
    }

    /// Read up to `dst.len()` frames, wrapping at the end of the ring.
    ///
    /// Applies a finished refill first. Returns the frames copied; the rest
    /// of `dst` is left untouched.
    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)] // Safety: n <= available <= size; read wraps via % size
    pub fn read_frames(&mut self, dst: &mut [[i16; 2]]) -> usize {
        self.apply_grant();
        let n = dst.len().min(usize::from(self.cursors.available));
        for frame in dst.iter_mut().take(n) {
            // SAFETY: `read` lies in the readable region, which never overlaps
            // the region a posted request hands to the writer.
            *frame = unsafe { self.samples.frame(usize::from(self.cursors.read)) };
            self.cursors.read = (self.cursors.read + 1) % self.size;
        }
        self.cursors.available -= n as u16;
        n
    }

    /// Post a refill if the ring has drained to half and no earlier request
    /// is still in flight. Returns `true` when a new request was posted.
    pub fn poll_refill(&mut self) -> bool {
        self.apply_grant();
        if self.cursors.available > self.half || self.handshake.phase.load(Ordering::Acquire) != IDLE {
            return false;
        }
        self.handshake.offset.store(self.cursors.write, Ordering::Relaxed);
        self.handshake.frames.store(self.half, Ordering::Relaxed);
        self.handshake.phase.store(POSTED, Ordering::Release);
        true
    }
}

/// Producer half, used from the audio refill interrupt.
pub struct RingWriter<'r> {
    samples: Samples<'r>,
    handshake: &'r Handshake,
}

// SAFETY: the writer only touches the region of the request it took, which
// the reader does not read until the grant is applied.
unsafe impl Send for RingWriter<'_> {}

impl RingWriter<'_> {
    /// Take the posted request. It stays in flight until [`grant`](Self::grant).
    pub fn take_request(&mut self) -> Option<RefillRequest> {
        if self.handshake.phase.load(Ordering::Acquire) != POSTED {
            return None;
        }
        let request = self.handshake.request();
        self.handshake.phase.store(FILLING, Ordering::Relaxed);
        Some(request)
    }

    /// Memory of the request taken with [`take_request`](Self::take_request).
    pub fn region_mut(&mut self) -> Option<&mut [i16]> {
        if self.handshake.phase.load(Ordering::Relaxed) != FILLING {
            return None;
        }
        // SAFETY: the reader neither reads this region nor posts another
        // request until it sees GRANTED, which only `grant` stores; `grant`
        // needs `&mut self`, so the slice is gone by then.
        unsafe { self.samples.region_mut(self.handshake.request()) }
    }

    /// Hand the filled region back. The reader applies it on its next
    /// access. Returns `false` if no request was being filled.
    pub fn grant(&mut self) -> bool {
        if self.handshake.phase.load(Ordering::Relaxed) != FILLING {
            return false;
        }
        self.handshake.phase.store(GRANTED, Ordering::Release);
        true
    }

    /// Serve the posted request with `fill(samples, frames)`. Returns `true`
    /// if there was one.
    pub fn refill(&mut self, fill: impl FnOnce(&mut [i16], usize)) -> bool {
        let Some(request) = self.take_request() else {
            return false;
        };
        if let Some(region) = self.region_mut() {
            fill(region, usize::from(request.frames));
        }
        self.grant()
    }
}
