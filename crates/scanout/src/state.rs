//! Display state machine.
//!
//! Advanced once per descriptor record. Each call names what the record
//! streams ([`Source`]) and which bookkeeping the driver must do around it;
//! the machine itself touches no buffers.
//!
//! ```text
//! [SyncPacketPre -> SyncPacket ->] Sync -> BackPorch -> TopBorder
//!   -> ActiveNop -> (ActiveBlank -> ActivePixels)* -> BottomBorder
//!   -> FrontPorch -> (wrap)
//! ```
//!
//! Border states and an empty back porch are skipped entirely.

use crate::timing::VerticalTimings;

/// Scanout phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ScanState {
    /// Not running.
    Idle = 0,
    /// One-record filler so active lines start on a record pair.
    ActiveNop = 1,
    /// Vertical back porch.
    BackPorch = 2,
    /// Top border lines.
    TopBorder = 3,
    /// Command part of an active line.
    ActiveBlank = 4,
    /// Pixel part of an active line.
    ActivePixels = 5,
    /// Bottom border lines.
    BottomBorder = 6,
    /// Vertical front porch.
    FrontPorch = 7,
    /// Vertical sync.
    Sync = 8,
    /// Info island half of the first HDMI sync line.
    SyncPacket = 9,
    /// Sync pulse half of the first HDMI sync line.
    SyncPacketPre = 10,
}

impl ScanState {
    /// `true` while VSYNC is asserted.
    pub const fn in_vertical_sync(self) -> bool {
        matches!(self, ScanState::Sync | ScanState::SyncPacket | ScanState::SyncPacketPre)
    }

    /// `true` if a record emitted in this state completes a scanline.
    const fn ends_line(self) -> bool {
        !matches!(
            self,
            ScanState::Idle | ScanState::ActiveBlank | ScanState::ActiveNop | ScanState::SyncPacketPre
        )
    }
}

/// Precompiled table a record streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TableId {
    /// Vertical sync line.
    VsyncOn,
    /// Vertical blanking line.
    VsyncOff,
    /// Border line.
    Border,
    /// Active line up to the pixel command.
    Active,
    /// First half of the info line.
    InfoPre,
    /// Second half of the info line.
    Info,
    /// Alignment filler.
    Nop,
}

/// What one record streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    /// A command table.
    Table(TableId),
    /// The line buffer slot under the display cursor.
    Pixels,
}

/// Result of one advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    /// State that emitted the record.
    pub state: ScanState,
    /// Record content.
    pub source: Source,
    /// Vertical sync ended: rewind the line pool and latch callbacks.
    pub frame_start: bool,
    /// A source line has been shown `line_rep` times: advance the pool.
    pub line_done: bool,
    /// Info line started: restart the per-frame audio budget.
    pub info_line: bool,
    /// Last line of the frame.
    pub frame_end: bool,
}

impl Step {
    const fn emit(state: ScanState, source: Source) -> Self {
        Self {
            state,
            source,
            frame_start: false,
            line_done: false,
            info_line: false,
            frame_end: false,
        }
    }
}

/// Vertical sequencing of one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMachine {
    v: VerticalTimings,
    line_rep: u16,
    info_line: bool,
    state: ScanState,
    lines: u16,
    line_rep_left: u16,
    frame: u32,
    scanline: u32,
}

impl StateMachine {
    /// Machine for `v` with each source line shown `line_rep` times.
    /// `info_line` inserts the HDMI info line at the top of each frame.
    pub fn new(v: VerticalTimings, line_rep: u16, info_line: bool) -> Self {
        Self {
            v,
            line_rep: line_rep.max(1),
            info_line,
            state: ScanState::Idle,
            lines: 0,
            line_rep_left: 0,
            frame: 0,
            scanline: 0,
        }
    }

    /// Current phase.
    pub const fn state(&self) -> ScanState {
        self.state
    }

    /// Completed frames since [`start`](Self::start).
    pub const fn frame(&self) -> u32 {
        self.frame
    }

    /// Lines emitted so far in the current frame.
    pub const fn scanline(&self) -> u32 {
        self.scanline
    }

    /// Lines left in the current phase.
    pub const fn lines_left(&self) -> u16 {
        self.lines
    }

    fn first_state(&self) -> ScanState {
        if self.info_line {
            ScanState::SyncPacketPre
        } else {
            ScanState::Sync
        }
    }

    /// Enter the first sync phase of frame 0.
    pub fn start(&mut self) {
        self.state = self.first_state();
        self.lines = self.v.sync;
        self.line_rep_left = self.line_rep;
        self.frame = 0;
        self.scanline = 0;
    }

    /// Force [`ScanState::Idle`].
    pub fn stop(&mut self) {
        self.state = ScanState::Idle;
        self.lines = 0;
    }

    /// Enter `state`, skipping every phase whose line count is zero.
    fn enter(&mut self, mut state: ScanState) {
        loop {
            let (lines, next) = match state {
                ScanState::BackPorch => (self.v.back_porch, ScanState::TopBorder),
                ScanState::TopBorder => (self.v.border_top, ScanState::ActiveNop),
                ScanState::ActiveNop => (self.v.active, ScanState::BottomBorder),
                ScanState::BottomBorder => (self.v.border_bottom, ScanState::FrontPorch),
                ScanState::FrontPorch => (self.v.front_porch.max(1), ScanState::FrontPorch),
                other => (self.v.sync.max(1), other),
            };
            if lines > 0 {
                self.state = state;
                self.lines = lines;
                return;
            }
            state = next;
        }
    }

    /// One line of the current phase done; `true` when the phase is over.
    fn count_line(&mut self) -> bool {
        self.lines = self.lines.saturating_sub(1);
        self.lines == 0
    }

    /// Produce the next record.
    ///
    /// `pair_index` is the record's position (0 or 1) inside the descriptor
    /// pair being filled.
    #[allow(clippy::arithmetic_side_effects)] // Safety: frame and scanline wrap far beyond any session
    pub fn advance(&mut self, pair_index: usize) -> Step {
        let state = self.state;
        let step = match state {
            ScanState::Idle => Step::emit(state, Source::Table(TableId::Nop)),
            ScanState::SyncPacketPre => {
                self.state = ScanState::SyncPacket;
                let mut step = Step::emit(state, Source::Table(TableId::InfoPre));
                step.info_line = true;
                step
            }
            ScanState::SyncPacket | ScanState::Sync => {
                let table = if state == ScanState::SyncPacket {
                    TableId::Info
                } else {
                    TableId::VsyncOn
                };
                let mut step = Step::emit(state, Source::Table(table));
                if self.count_line() {
                    step.frame_start = true;
                    self.enter(ScanState::BackPorch);
                } else {
                    self.state = ScanState::Sync;
                }
                step
            }
            ScanState::BackPorch => {
                if self.count_line() {
                    self.enter(ScanState::TopBorder);
                }
                Step::emit(state, Source::Table(TableId::VsyncOff))
            }
            ScanState::TopBorder => {
                if self.count_line() {
                    self.enter(ScanState::ActiveNop);
                }
                Step::emit(state, Source::Table(TableId::Border))
            }
            ScanState::ActiveNop if pair_index != 0 => {
                self.state = ScanState::ActiveBlank;
                Step::emit(state, Source::Table(TableId::Nop))
            }
            ScanState::ActiveNop | ScanState::ActiveBlank => {
                self.state = ScanState::ActivePixels;
                Step::emit(state, Source::Table(TableId::Active))
            }
            ScanState::ActivePixels => {
                let mut step = Step::emit(state, Source::Pixels);
                self.line_rep_left = self.line_rep_left.saturating_sub(1);
                if self.line_rep_left == 0 {
                    self.line_rep_left = self.line_rep;
                    step.line_done = true;
                }
                if self.count_line() {
                    self.enter(ScanState::BottomBorder);
                } else {
                    self.state = ScanState::ActiveBlank;
                }
                step
            }
            ScanState::BottomBorder => {
                if self.count_line() {
                    self.enter(ScanState::FrontPorch);
                }
                Step::emit(state, Source::Table(TableId::Border))
            }
            ScanState::FrontPorch => {
                let mut step = Step::emit(state, Source::Table(TableId::VsyncOff));
                if self.count_line() {
                    step.frame_end = true;
                    self.state = self.first_state();
                    self.lines = self.v.sync;
                }
                step
            }
        };

        if state.ends_line() {
            self.scanline += 1;
        }
        if step.frame_end {
            self.frame = self.frame.wrapping_add(1);
            self.scanline = 0;
        }
        step
    }
}
