//! HDMI audio packet injection.
//!
//! Every line table with a splice point ticks the packet scheduler once.
//! When it fires, a copy of the table is made in a scratch buffer with a
//! one-packet data island inserted in front of the sync pulse, and the
//! descriptor streams the copy instead of the table.
//!
//! ```text
//! table:   | ..front.. | SYNC(len)            | ..rest.. |
//! scratch: | ..front.. | PRE(8) | ISLAND(36) | SYNC(len - 44) | ..rest.. |
//! ```
//!
//! Scratch buffers rotate, so a buffer is rewritten only after the
//! descriptor pairs in flight have moved past it.
//!
//! [`AudioPath::split`] separates the packet side ([`AudioTx`], DMA
//! completion interrupt) from the ring writer (audio refill interrupt).

use hdmi::audio::{audio_sample_packet, MAX_FRAMES_PER_PACKET};
use hdmi::{encode_data_island, island_words, DataPacket, W_PREAMBLE};
use playback::{AudioClock, AudioRing, PacketScheduler, RingError, RingReader, RingWriter};

use crate::compiler::AUDIO_ISLAND_PERIODS;
use crate::hstx::{command_len, tmds_data_preamble, with_len, CMD_RAW, CMD_RAW_REPEAT};
use crate::timing::SyncPolarity;

/// Words per scratch buffer.
pub const SCRATCH_WORDS: usize = 64;
/// Scratch buffers in rotation.
pub const SCRATCH_BUFFERS: usize = 4;

/// Producer of PCM samples, called from the audio refill interrupt.
pub trait AudioSource: Send {
    /// Write exactly `frames` interleaved stereo frames into `buffer`
    /// (`2 * frames` samples).
    fn fill(&mut self, buffer: &mut [i16], frames: usize);
}

/// Audio counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioStats {
    /// Audio sample packets sent.
    pub packets: u32,
    /// Packets padded with silence because the ring ran dry.
    pub underruns: u32,
}

/// A spliced line ready to stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    /// Bus address of the scratch copy.
    pub addr: usize,
    /// Words in the copy.
    pub words: u32,
    /// The ring asked for a refill; raise the audio interrupt.
    pub refill: bool,
}

/// Ring, scheduler and scratch memory of the audio path.
pub struct AudioPath<'a> {
    ring: AudioRing<'a>,
    packets: Packets,
}

/// Packet-side state, touched only from the DMA completion interrupt.
struct Packets {
    scheduler: PacketScheduler,
    clock: AudioClock,
    polarity: SyncPolarity,
    block_pos: u8,
    scratch: [[u32; SCRATCH_WORDS]; SCRATCH_BUFFERS],
    next_scratch: usize,
    last_packet: Option<DataPacket>,
    stats: AudioStats,
}

impl<'a> AudioPath<'a> {
    /// Audio path over `buffer` (interleaved stereo) for `clock`.
    #[allow(clippy::large_stack_arrays)] // Safety: moved into the driver, which lives in a static
    pub fn new(buffer: &'a mut [i16], clock: AudioClock, polarity: SyncPolarity) -> Result<Self, RingError> {
        Ok(Self {
            ring: AudioRing::new(buffer)?,
            packets: Packets {
                scheduler: PacketScheduler::new(clock.add, clock.framesync_samples()),
                clock,
                polarity,
                block_pos: 0,
                scratch: [[0; SCRATCH_WORDS]; SCRATCH_BUFFERS],
                next_scratch: 0,
                last_packet: None,
                stats: AudioStats::default(),
            },
        })
    }

    /// Packet side and ring writer, for use from different interrupts.
    pub fn split(&mut self) -> (AudioTx<'_>, RingWriter<'_>) {
        let (reader, writer) = self.ring.split();
        (
            AudioTx {
                reader,
                packets: &mut self.packets,
            },
            writer,
        )
    }

    /// Packet side alone.
    pub fn tx(&mut self) -> AudioTx<'_> {
        self.split().0
    }

    /// Clock parameters.
    pub const fn clock(&self) -> &AudioClock {
        &self.packets.clock
    }

    /// Counters since the last reset.
    pub const fn stats(&self) -> AudioStats {
        self.packets.stats
    }

    /// The sample ring.
    pub fn ring(&self) -> &AudioRing<'a> {
        &self.ring
    }

    /// Packet scheduler state.
    pub const fn scheduler(&self) -> &PacketScheduler {
        &self.packets.scheduler
    }

    /// Most recent audio sample packet.
    pub const fn last_packet(&self) -> Option<&DataPacket> {
        self.packets.last_packet.as_ref()
    }

    /// Empty ring, scheduler at its initial phase, counters cleared.
    pub fn reset(&mut self) {
        self.ring.reset();
        let p = &mut self.packets;
        p.scheduler.reset();
        p.block_pos = 0;
        p.next_scratch = 0;
        p.last_packet = None;
        p.stats = AudioStats::default();
    }

    /// Fill the whole ring before scanout starts.
    pub fn prime(&mut self, source: &mut dyn AudioSource) {
        self.ring.prime(|buffer, frames| source.fill(buffer, frames));
    }

    /// Serve the outstanding refill request, if any. Returns `true` if the
    /// source was called.
    pub fn refill(&mut self, source: &mut dyn AudioSource) -> bool {
        refill(&mut self.ring.writer(), source)
    }

    /// See [`AudioTx::on_line`].
    pub fn on_line(&mut self, table: &[u32], splice: usize, vertical_sync: bool) -> Option<Injection> {
        self.tx().on_line(table, splice, vertical_sync)
    }
}

/// Serve the request `writer` has posted from `source`.
pub fn refill(writer: &mut RingWriter<'_>, source: &mut dyn AudioSource) -> bool {
    writer.refill(|buffer, frames| source.fill(buffer, frames))
}

/// Packet side of the audio path: ring reader, scheduler and scratch copies.
pub struct AudioTx<'r> {
    reader: RingReader<'r>,
    packets: &'r mut Packets,
}

impl AudioTx<'_> {
    /// Counters since the last reset.
    pub fn stats(&self) -> AudioStats {
        self.packets.stats
    }

    /// Clock parameters.
    pub fn clock(&self) -> &AudioClock {
        &self.packets.clock
    }

    /// Most recent audio sample packet.
    pub fn last_packet(&self) -> Option<&DataPacket> {
        self.packets.last_packet.as_ref()
    }

    /// Frames the packet side may still read.
    pub fn available(&self) -> u16 {
        self.reader.available()
    }

    /// Info line reached: frame-sync mode restarts its per-frame budget.
    pub fn start_frame(&mut self) {
        self.packets.scheduler.start_frame();
    }

    /// Tick the scheduler for one line drawn from `table` and, if a packet
    /// is due, return the spliced copy.
    ///
    /// `vertical_sync` selects the VSYNC level carried through the island.
    pub fn on_line(&mut self, table: &[u32], splice: usize, vertical_sync: bool) -> Option<Injection> {
        let frames = self.packets.scheduler.tick()?;
        let packet = self.next_packet(usize::from(frames));
        let refill = self.reader.poll_refill();
        let (addr, words) = self.packets.splice(table, splice, vertical_sync, &packet)?;
        Some(Injection { addr, words, refill })
    }

    /// Build the next sample packet from up to `frames` ring frames,
    /// zero-padded when the ring runs dry.
    fn next_packet(&mut self, frames: usize) -> DataPacket {
        let want = frames.min(MAX_FRAMES_PER_PACKET);
        let mut samples = [[0i16; 2]; MAX_FRAMES_PER_PACKET];
        let frames = samples.get_mut(..want).unwrap_or_default();
        let got = self.reader.read_frames(frames);
        let p = &mut *self.packets;
        if got < want {
            p.stats.underruns = p.stats.underruns.wrapping_add(1);
            trace!("audio underrun: {} of {} frames", got, want);
        }
        let (packet, next) = audio_sample_packet(frames, p.block_pos);
        p.block_pos = next;
        p.stats.packets = p.stats.packets.wrapping_add(1);
        p.last_packet = Some(packet);
        packet
    }
}

impl Packets {
    /// Copy `table` into the next scratch buffer with `packet` spliced in
    /// at `splice`.
    #[allow(clippy::arithmetic_side_effects)] // Safety: positions bounded by SCRATCH_WORDS via get_mut; index wraps via %
    fn splice(&mut self, table: &[u32], splice: usize, vertical_sync: bool, packet: &DataPacket) -> Option<(usize, u32)> {
        let front = table.get(..splice)?;
        let (&sync_cmd, tail) = table.get(splice..)?.split_first()?;
        let sync_len = command_len(sync_cmd).checked_sub(AUDIO_ISLAND_PERIODS)?;

        let index = self.next_scratch;
        self.next_scratch = (index + 1) % SCRATCH_BUFFERS;
        let dst = self.scratch.get_mut(index)?;

        let levels = self.polarity.levels(true, vertical_sync);
        let island = island_words(1);
        let mut pos = 0;
        dst.get_mut(pos..pos + front.len())?.copy_from_slice(front);
        pos += front.len();
        dst.get_mut(pos..pos + 2)?
            .copy_from_slice(&[CMD_RAW_REPEAT | W_PREAMBLE as u32, tmds_data_preamble(levels)]);
        pos += 2;
        *dst.get_mut(pos)? = CMD_RAW | island as u32;
        pos += 1;
        encode_data_island(dst.get_mut(pos..pos + island)?, core::slice::from_ref(packet), levels.bits()).ok()?;
        pos += island;
        *dst.get_mut(pos)? = with_len(sync_cmd, sync_len);
        pos += 1;
        dst.get_mut(pos..pos + tail.len())?.copy_from_slice(tail);
        pos += tail.len();

        let addr = dst.as_ptr() as usize;
        Some((addr, pos as u32))
    }
}
