//! Line buffer pool.
//!
//! [`LINE_SLOTS`] scanline buffers in one caller-provided slice. The display
//! reads slot `display` while the renderer fills slot `render`, always one
//! ahead (mod [`LINE_SLOTS`]).
//!
//! # Handshake
//!
//! [`LinePool::split`] hands out a [`LineFeed`] for the DMA completion
//! interrupt (Tier 1) and a [`LineSlots`] for the line render interrupt
//! (Tier 2). They share one task record and its phase:
//!
//! ```text
//!          post (Tier 1)           take_task (Tier 2)
//!   IDLE ───────────────► REQUESTED ─────────────────► RENDERING
//!    ▲                                                     │
//!    └──────────────────── complete (Tier 2) ◄─────────────┘
//! ```
//!
//! Each transition has a single owner, so plain atomic loads and stores are
//! enough. Tier 1 writes the task fields only while the phase is IDLE and
//! retires a finished task the next time it runs. A refill that falls due
//! while a task is still outstanding is dropped and counted.
//!
//! Tier 1 never points the display at a slot an outstanding task covers. If
//! the slot it would show is still owed by the renderer, it repeats a slot
//! the renderer is not touching and counts a late line.

use core::marker::PhantomData;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, AtomicUsize, Ordering};

/// Number of line slots.
pub const LINE_SLOTS: usize = 3;

const IDLE: u8 = 0;
const REQUESTED: u8 = 1;
const RENDERING: u8 = 2;

/// Producer of scanlines, called from the line render interrupt.
pub trait LineRenderer: Send {
    /// Write `task.height` lines of `task.words` words, starting at source
    /// line `task.line`, into `dst` at `task.pitch` words per line.
    fn render(&mut self, task: &LineTask, dst: &mut [u32]);
}

/// A render request for `height` consecutive source lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineTask {
    /// First slot to write.
    pub slot: usize,
    /// First source line.
    pub line: u16,
    /// Source pixels per line.
    pub width: u16,
    /// Line buffer words per line.
    pub words: u16,
    /// Lines to render into consecutive slots.
    pub height: u16,
    /// Words between the starts of consecutive lines.
    pub pitch: usize,
    /// First request of a frame.
    pub new_frame: bool,
}

impl LineTask {
    /// `true` if the task writes `slot`.
    #[allow(clippy::arithmetic_side_effects)] // Safety: slot < LINE_SLOTS, height <= 2
    pub fn covers(&self, slot: usize) -> bool {
        slot >= self.slot && slot < self.slot + usize::from(self.height)
    }
}

/// Line shape, fixed for the life of the pool.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    words: usize,
    width: u16,
    source_lines: u16,
}

impl Geometry {
    fn task(&self, slot: usize, line: u16, height: u16, new_frame: bool) -> LineTask {
        LineTask {
            slot,
            line,
            width: self.width,
            words: u16::try_from(self.words).unwrap_or(u16::MAX),
            height,
            pitch: self.words,
            new_frame,
        }
    }
}

/// Raw view of the caller's line memory.
#[derive(Clone, Copy)]
struct Lines<'a> {
    ptr: NonNull<u32>,
    len: usize,
    _buf: PhantomData<&'a mut [u32]>,
}

impl<'a> Lines<'a> {
    fn new(buf: &'a mut [u32]) -> Self {
        Self {
            len: buf.len(),
            ptr: NonNull::from(buf).cast(),
            _buf: PhantomData,
        }
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: slot < LINE_SLOTS, checked against len in LinePool::new
    fn addr(&self, slot: usize, words: usize) -> usize {
        self.ptr.as_ptr().wrapping_add(slot * words) as usize
    }
}

/// Task record shared by both tiers.
struct LineHandshake {
    phase: AtomicU8,
    slot: AtomicUsize,
    line: AtomicU16,
    height: AtomicU16,
    new_frame: AtomicBool,
}

impl LineHandshake {
    const fn new() -> Self {
        Self {
            phase: AtomicU8::new(IDLE),
            slot: AtomicUsize::new(0),
            line: AtomicU16::new(0),
            height: AtomicU16::new(0),
            new_frame: AtomicBool::new(false),
        }
    }

    fn busy(&self) -> bool {
        self.phase.load(Ordering::Acquire) != IDLE
    }
}

/// Tier-1 bookkeeping.
#[derive(Debug, Default)]
struct FeedState {
    display: usize,
    render: usize,
    next_line: u16,
    /// Copy of the task last posted, until Tier 1 retires it.
    posted: Option<LineTask>,
    /// The posted task belongs to a previous frame.
    stale: bool,
    /// A frame-start request was dropped; the next request carries the flag.
    frame_pending: bool,
    dropped: u32,
    late: u32,
}

/// Ring of line slots plus the single outstanding render task.
pub struct LinePool<'a> {
    lines: Lines<'a>,
    geometry: Geometry,
    feed: FeedState,
    shared: LineHandshake,
}

// SAFETY: the pool owns the only access to its buffer for 'a. Tier 1 only
// takes addresses of slots; Tier 2 writes the slots of the task it took.
unsafe impl Send for LinePool<'_> {}

impl<'a> LinePool<'a> {
    /// Pool over `buf` for lines of `words` words carrying `width` source
    /// pixels, `source_lines` lines per frame.
    ///
    /// Returns `None` if `buf` cannot hold [`LINE_SLOTS`] lines.
    #[allow(clippy::arithmetic_side_effects)] // Safety: u16 times a small constant
    pub fn new(buf: &'a mut [u32], words: u16, width: u16, source_lines: u16) -> Option<Self> {
        let words = usize::from(words);
        if buf.len() < words * LINE_SLOTS {
            return None;
        }
        Some(Self {
            lines: Lines::new(buf),
            geometry: Geometry {
                words,
                width,
                source_lines,
            },
            feed: FeedState {
                render: 1,
                ..FeedState::default()
            },
            shared: LineHandshake::new(),
        })
    }

    /// Back to slot 0 with nothing outstanding. Counters are kept.
    pub fn reset(&mut self) {
        self.feed = FeedState {
            render: 1,
            dropped: self.feed.dropped,
            late: self.feed.late,
            ..FeedState::default()
        };
        self.shared.phase.store(IDLE, Ordering::Relaxed);
    }

    /// Tier-1 and Tier-2 halves.
    pub fn split(&mut self) -> (LineFeed<'_>, LineSlots<'_>) {
        (
            LineFeed {
                lines: self.lines,
                geometry: self.geometry,
                state: &mut self.feed,
                shared: &self.shared,
            },
            LineSlots {
                lines: self.lines,
                geometry: self.geometry,
                shared: &self.shared,
            },
        )
    }

    /// Slot the display reads next.
    pub const fn display_slot(&self) -> usize {
        self.feed.display
    }

    /// Slot the next refill writes.
    pub const fn render_slot(&self) -> usize {
        self.feed.render
    }

    /// Words per line.
    pub const fn words(&self) -> usize {
        self.geometry.words
    }

    /// Source line the next refill renders, as of the last retired task.
    pub const fn next_line(&self) -> u16 {
        self.feed.next_line
    }

    /// Refills dropped because a task was outstanding.
    pub const fn dropped(&self) -> u32 {
        self.feed.dropped
    }

    /// Pixel lines shown from a stale slot because the renderer was late.
    pub const fn late_lines(&self) -> u32 {
        self.feed.late
    }

    /// `true` when no task is outstanding.
    pub fn is_idle(&self) -> bool {
        !self.shared.busy()
    }

    /// The outstanding task, requested or being rendered.
    pub fn outstanding(&self) -> Option<LineTask> {
        self.feed.posted.filter(|_| self.shared.busy())
    }

    /// Bus address of `slot`.
    pub fn slot_addr(&self, slot: usize) -> usize {
        self.lines.addr(slot, self.geometry.words)
    }
}

/// Tier-1 half: cursors, requests and the addresses the display streams.
pub struct LineFeed<'r> {
    lines: Lines<'r>,
    geometry: Geometry,
    state: &'r mut FeedState,
    shared: &'r LineHandshake,
}

// SAFETY: the feed never dereferences the line memory, it only hands out
// addresses of slots no outstanding task covers.
unsafe impl Send for LineFeed<'_> {}

impl LineFeed<'_> {
    /// Words per line.
    pub fn words(&self) -> usize {
        self.geometry.words
    }

    /// Refills dropped because a task was outstanding.
    pub fn dropped(&self) -> u32 {
        self.state.dropped
    }

    /// The outstanding task, requested or being rendered.
    pub fn outstanding(&self) -> Option<LineTask> {
        self.state.posted.filter(|_| self.shared.busy())
    }

    /// Slot the display will actually read: the display slot, or the
    /// nearest slot the outstanding task does not cover.
    #[allow(clippy::arithmetic_side_effects)] // Safety: display < LINE_SLOTS, wraps via %
    pub fn display_slot(&self) -> usize {
        let display = self.state.display;
        match self.outstanding() {
            Some(task) if task.covers(display) => {
                let previous = (display + LINE_SLOTS - 1) % LINE_SLOTS;
                let next = (display + 1) % LINE_SLOTS;
                [previous, next].into_iter().find(|&s| !task.covers(s)).unwrap_or(display)
            }
            _ => display,
        }
    }

    /// Bus address for the next pixel record.
    pub fn pixels_addr(&mut self) -> usize {
        self.retire();
        let slot = self.display_slot();
        if slot != self.state.display {
            self.state.late = self.state.late.saturating_add(1);
            trace!("line {} late, repeating slot {}", self.state.display, slot);
        }
        self.lines.addr(slot, self.geometry.words)
    }

    /// Rewind for a new frame and request the first two lines.
    ///
    /// Returns `true` when a task was posted and the render interrupt must be
    /// raised.
    pub fn start_frame(&mut self) -> bool {
        self.retire();
        let s = &mut *self.state;
        s.display = 0;
        s.render = 1;
        s.next_line = 0;
        if s.posted.is_some() {
            s.stale = true;
        }
        self.request(0, 2, true)
    }

    /// Move past the line just displayed and request the slot after the next
    /// one. Returns `true` when a task was posted.
    #[allow(clippy::arithmetic_side_effects)] // Safety: indices stay < LINE_SLOTS via %
    pub fn advance(&mut self) -> bool {
        self.retire();
        let s = &mut *self.state;
        s.display = (s.display + 1) % LINE_SLOTS;
        s.render = (s.render + 1) % LINE_SLOTS;
        let render = s.render;
        self.request(render, 1, false)
    }

    /// Fold a task Tier 2 has completed back into the cursors.
    #[allow(clippy::arithmetic_side_effects)] // Safety: line + height <= source_lines
    fn retire(&mut self) {
        let Some(task) = self.state.posted else {
            return;
        };
        if self.shared.busy() {
            return;
        }
        self.state.posted = None;
        // A frame restart underneath this task has already rewound next_line.
        if !core::mem::take(&mut self.state.stale) {
            self.state.next_line = task.line + task.height;
        }
    }

    fn request(&mut self, slot: usize, height: u16, new_frame: bool) -> bool {
        let s = &mut *self.state;
        if s.next_line >= self.geometry.source_lines {
            return false;
        }
        if s.posted.is_some() {
            s.dropped = s.dropped.saturating_add(1);
            s.frame_pending |= new_frame;
            trace!("line refill dropped at line {}", s.next_line);
            return false;
        }
        let height = height.min(self.geometry.source_lines.saturating_sub(s.next_line));
        let new_frame = new_frame || core::mem::take(&mut s.frame_pending);
        let task = self.geometry.task(slot, s.next_line, height, new_frame);
        self.shared.slot.store(slot, Ordering::Relaxed);
        self.shared.line.store(task.line, Ordering::Relaxed);
        self.shared.height.store(height, Ordering::Relaxed);
        self.shared.new_frame.store(new_frame, Ordering::Relaxed);
        self.shared.phase.store(REQUESTED, Ordering::Release);
        s.posted = Some(task);
        true
    }
}

/// Tier-2 half: takes the posted task and hands out the memory it renders.
pub struct LineSlots<'r> {
    lines: Lines<'r>,
    geometry: Geometry,
    shared: &'r LineHandshake,
}

// SAFETY: the slots half writes only the slots of the task it took, which
// Tier 1 does not stream while the task is outstanding.
unsafe impl Send for LineSlots<'_> {}

impl LineSlots<'_> {
    /// Hand the requested task to the renderer.
    pub fn take_task(&mut self) -> Option<LineTask> {
        if self.shared.phase.load(Ordering::Acquire) != REQUESTED {
            return None;
        }
        let task = self.geometry.task(
            self.shared.slot.load(Ordering::Relaxed),
            self.shared.line.load(Ordering::Relaxed),
            self.shared.height.load(Ordering::Relaxed),
            self.shared.new_frame.load(Ordering::Relaxed),
        );
        self.shared.phase.store(RENDERING, Ordering::Relaxed);
        Some(task)
    }

    /// Memory the task being rendered writes: `height` lines at `pitch`.
    ///
    /// Returns `None` for anything but the task taken last.
    #[allow(clippy::arithmetic_side_effects)] // Safety: slot + height <= LINE_SLOTS for every posted task
    pub fn region_mut(&mut self, task: &LineTask) -> Option<&mut [u32]> {
        let current = self.shared.phase.load(Ordering::Relaxed) == RENDERING
            && task.slot == self.shared.slot.load(Ordering::Relaxed)
            && task.height == self.shared.height.load(Ordering::Relaxed);
        if !current {
            return None;
        }
        let start = task.slot * self.geometry.words;
        let len = usize::from(task.height) * self.geometry.words;
        if start + len > self.lines.len {
            return None;
        }
        // SAFETY: in bounds of the caller's buffer. While the phase is
        // RENDERING Tier 1 neither streams these slots nor posts another
        // task, and `complete` needs `&mut self`, so the slice is gone
        // before the slots are handed back.
        Some(unsafe { core::slice::from_raw_parts_mut(self.lines.ptr.as_ptr().add(start), len) })
    }

    /// Retire the task taken with [`take_task`](Self::take_task).
    pub fn complete(&mut self) {
        if self.shared.phase.load(Ordering::Relaxed) == RENDERING {
            self.shared.phase.store(IDLE, Ordering::Release);
        }
    }
}
