//! Command-word compiler.
//!
//! Turns adjusted [`Timings`] into one immutable command table per line
//! archetype. A table holds every command word of one scanline except the
//! pixel data itself, which the state machine streams from a line buffer as
//! a separate descriptor right after the `active` table.
//!
//! For HDMI with audio each table that contains a horizontal sync pulse also
//! records a splice index: the position of the sync pulse command. An audio
//! data island is injected there by copying the table into scratch memory,
//! never by editing the table.

use hdmi::{encode_data_island, island_words, DataPacket, W_GUARDBAND, W_PREAMBLE};

use crate::error::ConfigError;
use crate::hstx::{
    command, command_len, tmds_data_preamble, tmds_sync_word, tmds_video_preamble, vga_sync_word, CMD_NOP,
    CMD_RAW, CMD_RAW_REPEAT, CMD_TMDS, CMD_TMDS_REPEAT, TMDS_VIDEO_GUARD_BAND,
};
use crate::timing::{SyncLevels, Timings};

/// Word capacity of a line table.
pub const TABLE_WORDS: usize = 16;
/// Word capacity of the info island table.
pub const INFO_WORDS: usize = 5 + island_words(hdmi::island::MAX_ISLAND_PACKETS);

/// Video preamble plus leading guard band ahead of HDMI video data.
pub const VIDEO_LEAD: u32 = (W_PREAMBLE + W_GUARDBAND) as u32;
/// Periods of one injected audio packet: data preamble plus a one-packet
/// island.
pub const AUDIO_ISLAND_PERIODS: u32 = (W_PREAMBLE + island_words(1)) as u32;
/// Control period between the info line's sync pulse and its data island.
pub const INFO_LEAD: u32 = 64;

/// One precompiled line archetype.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandTable<const N: usize = TABLE_WORDS> {
    words: heapless::Vec<u32, N>,
    splice: Option<usize>,
}

impl<const N: usize> CommandTable<N> {
    /// Command words, in emission order.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// `true` for tables of outputs that never use them.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Index of the sync pulse command an audio island may be spliced in
    /// front of.
    pub fn splice(&self) -> Option<usize> {
        self.splice
    }

    /// Bus address of the first word.
    pub fn addr(&self) -> usize {
        self.words.as_ptr() as usize
    }

    /// Output pixel periods the table accounts for. A trailing streamed
    /// command counts its full length even though its data comes from the
    /// following descriptor.
    #[allow(clippy::arithmetic_side_effects)] // Safety: at most N commands of at most 0xFFF periods
    pub fn periods(&self) -> u32 {
        let mut total = 0;
        let mut i = 0;
        while let Some(&word) = self.words.get(i) {
            let len = command_len(word);
            match word & !crate::hstx::LEN_MASK {
                CMD_RAW_REPEAT | CMD_TMDS_REPEAT => {
                    total += len;
                    i += 2;
                }
                CMD_RAW | CMD_TMDS => {
                    total += len;
                    i += 1 + len as usize;
                }
                _ => i += 1,
            }
        }
        total
    }

    fn push(&mut self, word: u32) -> Result<(), ConfigError> {
        self.words.push(word).map_err(|_| ConfigError::TableOverflow)
    }

    /// `op` for `len` periods followed by its literal word.
    fn run(&mut self, op: u32, len: u32, literal: u32) -> Result<(), ConfigError> {
        self.push(command(op, len).ok_or(ConfigError::HorizontalBudget)?)?;
        self.push(literal)
    }

    /// Like [`run`](Self::run), skipped when `len` is zero.
    fn optional_run(&mut self, op: u32, len: u32, literal: u32) -> Result<(), ConfigError> {
        if len == 0 {
            return Ok(());
        }
        self.run(op, len, literal)
    }

    fn mark_splice(&mut self) {
        self.splice = Some(self.words.len());
    }
}

/// Line encoding for the compiled tables.
#[derive(Debug, Clone, Copy)]
pub enum LineEncoding<'p> {
    /// TMDS control symbols, no data islands.
    Dvi,
    /// TMDS with a per-frame info island and, if `audio`, splice points for
    /// audio packets.
    Hdmi {
        /// Packets sent once per frame on the first vertical sync line.
        info: &'p [DataPacket],
        /// Record splice points.
        audio: bool,
    },
    /// Raw sync pins.
    Vga,
}

/// All compiled tables of a mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineTables {
    /// Vertical sync asserted.
    pub vsync_on: CommandTable,
    /// Vertical blanking.
    pub vsync_off: CommandTable,
    /// Top and bottom border lines, including the pixel run.
    pub border: CommandTable,
    /// Active line up to its pixel command; pixel data follows separately.
    pub active: CommandTable,
    /// First half of the HDMI info line, through the sync pulse.
    pub info_pre: CommandTable,
    /// Second half of the HDMI info line: preamble, info island, blanking.
    pub info: CommandTable<INFO_WORDS>,
    /// Alignment filler.
    pub nop: CommandTable,
}

/// Sync symbols for one encoding.
struct Symbols {
    vga: bool,
    idle: SyncLevels,
    hpulse: SyncLevels,
    vpulse: SyncLevels,
    both: SyncLevels,
}

impl Symbols {
    fn word(&self, levels: SyncLevels) -> u32 {
        if self.vga {
            vga_sync_word(levels)
        } else {
            tmds_sync_word(levels)
        }
    }

    /// Blank pixel run: encoded black for TMDS, idle sync pins for VGA.
    fn blank(&self, table: &mut CommandTable, len: u32) -> Result<(), ConfigError> {
        if self.vga {
            table.optional_run(CMD_RAW_REPEAT, len, self.word(self.idle))
        } else {
            table.optional_run(CMD_TMDS_REPEAT, len, 0)
        }
    }
}

/// Compile every line archetype of `timings`.
///
/// Deterministic: identical inputs give identical tables.
///
/// # Errors
///
/// [`ConfigError::HorizontalBudget`] when a porch or sync phase is empty, a
/// run exceeds the serializer's 12-bit length, the HDMI back porch cannot
/// hold the video preamble and guard band, the sync pulse cannot hold an
/// audio island, or the info line cannot hold the info island.
#[allow(clippy::arithmetic_side_effects)] // Safety: u16 terms summed in u32; subtractions follow explicit budget checks
pub fn compile(timings: &Timings, encoding: LineEncoding<'_>) -> Result<LineTables, ConfigError> {
    let h = &timings.h;
    let (front_porch, sync, back_porch) = (
        u32::from(h.front_porch),
        u32::from(h.sync),
        u32::from(h.back_porch),
    );
    let (active, border_left, border_right) = (
        u32::from(h.active),
        u32::from(h.border_left),
        u32::from(h.border_right),
    );
    if front_porch == 0 || sync == 0 || back_porch == 0 {
        return Err(ConfigError::HorizontalBudget);
    }

    let (hdmi, audio) = match encoding {
        LineEncoding::Hdmi { audio, .. } => (true, audio),
        LineEncoding::Dvi | LineEncoding::Vga => (false, false),
    };
    if hdmi && back_porch <= VIDEO_LEAD {
        return Err(ConfigError::HorizontalBudget);
    }
    if audio && sync <= AUDIO_ISLAND_PERIODS {
        return Err(ConfigError::HorizontalBudget);
    }

    let polarity = timings.polarity;
    let sym = Symbols {
        vga: matches!(encoding, LineEncoding::Vga),
        idle: polarity.levels(false, false),
        hpulse: polarity.levels(true, false),
        vpulse: polarity.levels(false, true),
        both: polarity.levels(true, true),
    };
    let line_tail = back_porch + border_left + active;

    let mut tables = LineTables::default();

    // Vertical sync and blanking lines.
    for (table, hidle, hpulse) in [
        (&mut tables.vsync_on, sym.vpulse, sym.both),
        (&mut tables.vsync_off, sym.idle, sym.hpulse),
    ] {
        table.run(CMD_RAW_REPEAT, border_right + front_porch, sym.word(hidle))?;
        if audio {
            table.mark_splice();
        }
        table.run(CMD_RAW_REPEAT, sync, sym.word(hpulse))?;
        table.run(CMD_RAW_REPEAT, line_tail, sym.word(hidle))?;
        table.push(CMD_NOP)?;
    }

    // Border and active lines share everything up to the pixel run.
    for table in [&mut tables.border, &mut tables.active] {
        sym.blank(table, border_right)?;
        table.run(CMD_RAW_REPEAT, front_porch, sym.word(sym.idle))?;
        if audio {
            table.mark_splice();
        }
        table.run(CMD_RAW_REPEAT, sync, sym.word(sym.hpulse))?;
        if hdmi {
            table.run(CMD_RAW_REPEAT, back_porch - VIDEO_LEAD, sym.word(sym.idle))?;
            table.run(CMD_RAW_REPEAT, W_PREAMBLE as u32, tmds_video_preamble(sym.idle))?;
            table.run(CMD_RAW_REPEAT, W_GUARDBAND as u32, TMDS_VIDEO_GUARD_BAND)?;
        } else {
            table.run(CMD_RAW_REPEAT, back_porch, sym.word(sym.idle))?;
        }
    }
    if sym.vga {
        tables
            .border
            .run(CMD_RAW_REPEAT, border_left + active, sym.word(sym.idle))?;
    } else {
        tables.border.run(CMD_TMDS_REPEAT, border_left + active, 0)?;
    }
    sym.blank(&mut tables.active, border_left)?;
    let pixels = if sym.vga { CMD_RAW } else { CMD_TMDS };
    tables
        .active
        .push(command(pixels, active).ok_or(ConfigError::HorizontalBudget)?)?;

    if let LineEncoding::Hdmi { info, .. } = encoding {
        compile_info_line(&mut tables, &sym, timings, info, audio)?;
    }

    tables.nop.push(CMD_NOP)?;

    debug_assert_eq!(tables.vsync_on.periods(), h.total);
    debug_assert_eq!(tables.border.periods(), h.total);
    debug_assert_eq!(tables.active.periods(), h.total);
    debug!(
        "compiled line tables: vsync {} border {} active {} info {} words",
        tables.vsync_on.len(),
        tables.border.len(),
        tables.active.len(),
        tables.info_pre.len() + tables.info.len()
    );
    Ok(tables)
}

/// The first vertical sync line of an HDMI frame, split in two so the
/// island can follow a fixed control period after the sync pulse.
#[allow(clippy::arithmetic_side_effects)] // Safety: tail checked against lead + island before subtracting
fn compile_info_line(
    tables: &mut LineTables,
    sym: &Symbols,
    timings: &Timings,
    info: &[DataPacket],
    audio: bool,
) -> Result<(), ConfigError> {
    let h = &timings.h;
    let mut island = [0u32; island_words(hdmi::island::MAX_ISLAND_PACKETS)];
    let len = encode_data_island(&mut island, info, sym.vpulse.bits())?;
    let len32 = u32::try_from(len).map_err(|_| ConfigError::HorizontalBudget)?;

    let after_sync = u32::from(h.back_porch) + u32::from(h.border_left) + u32::from(h.active);
    let used = INFO_LEAD + W_PREAMBLE as u32 + len32;
    if after_sync <= used {
        return Err(ConfigError::HorizontalBudget);
    }

    let pre = &mut tables.info_pre;
    pre.run(
        CMD_RAW_REPEAT,
        u32::from(h.border_right) + u32::from(h.front_porch),
        sym.word(sym.vpulse),
    )?;
    if audio {
        pre.mark_splice();
    }
    pre.run(CMD_RAW_REPEAT, u32::from(h.sync), sym.word(sym.both))?;
    pre.run(CMD_RAW_REPEAT, INFO_LEAD, sym.word(sym.vpulse))?;

    let body = &mut tables.info;
    body.run(CMD_RAW_REPEAT, W_PREAMBLE as u32, tmds_data_preamble(sym.vpulse))?;
    body.push(command(CMD_RAW, len32).ok_or(ConfigError::HorizontalBudget)?)?;
    let words = island.get(..len).ok_or(ConfigError::TableOverflow)?;
    body.words
        .extend_from_slice(words)
        .map_err(|_| ConfigError::TableOverflow)?;
    body.run(CMD_RAW_REPEAT, after_sync - used, sym.word(sym.vpulse))?;

    debug_assert_eq!(tables.info_pre.periods() + tables.info.periods(), h.total);
    Ok(())
}
