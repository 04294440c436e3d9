//! The scanout driver.
//!
//! [`Scanout`] owns the compiled tables, the state machine, the descriptor
//! ring, the line pool and the optional audio path. While streaming it is
//! driven from three interrupt handlers:
//!
//! | Handler | Line | Tier |
//! |---|---|---|
//! | [`ScanoutIrq::on_dma_complete`] | list-reset channel completion | 1 |
//! | [`LineService::on_line_render`] | software-raised | 2 |
//! | [`AudioService::on_audio_refill`] | software-raised | 2 |
//!
//! # Interrupt handles
//!
//! Tier 1 preempts Tier 2, so the handlers cannot share one `&mut Scanout`.
//! [`Scanout::split`] borrows the driver into one handle per interrupt. The
//! handles share nothing but the line and PCM handshakes, which are plain
//! atomics, so each can be moved into the state of its own interrupt. Drop
//! them before calling [`Scanout::stop`].
//!
//! [`Scanout::on_dma_complete`] and friends split internally; they suit
//! setups where one lock already serializes every handler, and host tests.
//!
//! # Placement
//!
//! The descriptor ring, the command tables and the audio scratch buffers are
//! read by DMA through raw addresses. Once [`Scanout::start`] has been called
//! the driver must not move until [`Scanout::stop`]; keep it in a `static`
//! (for example through `static_cell`) or otherwise pinned memory.
//!
//! # Example
//!
//! ```ignore
//! let config = VideoMode::MODE_320X240.config(Output::Dvi);
//! let scanout = SCANOUT.init(Scanout::new(backend, config, LINES.init([0; 960]))?);
//! scanout.set_renderer(renderer);
//! scanout.start()?;
//! let (irq, lines, audio) = scanout.split();
//! ```

use hdmi::infoframe::{audio_clock_regeneration, audio_infoframe, avi_infoframe, general_control};
use hdmi::DataPacket;
use platform::{BackendError, ChannelId, ChannelRole, DmaDescriptor, IrqRole, ScanoutBackend, SerializerConfig};
use playback::{AudioClock, RingWriter};

use crate::audio_path::{self, AudioPath, AudioSource, AudioStats, AudioTx};
use crate::chain::{DescriptorRing, PAIR, RECORDS};
use crate::compiler::{compile, LineEncoding, LineTables};
use crate::config::{Output, ScanoutConfig};
use crate::error::ConfigError;
use crate::linebuf::{LineFeed, LinePool, LineRenderer, LineSlots, LineTask, LINE_SLOTS};
use crate::state::{ScanState, Source, StateMachine, Step, TableId};
use crate::timing::Timings;

// ── Resources ────────────────────────────────────────────────────────────────

/// DMA channels of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Channels {
    stream: ChannelId,
    display_list: ChannelId,
    list_reset: ChannelId,
}

impl Channels {
    const fn all(&self) -> [ChannelId; 3] {
        [self.stream, self.display_list, self.list_reset]
    }
}

/// Resources claimed so far during setup, released again on failure.
#[derive(Default)]
struct Claims {
    channels: heapless::Vec<ChannelId, 3>,
    interrupts: heapless::Vec<IrqRole, 3>,
}

impl Claims {
    fn channel<B: ScanoutBackend>(&mut self, backend: &mut B, role: ChannelRole) -> Result<ChannelId, ConfigError> {
        let id = backend.claim_channel(role)?;
        if self.channels.push(id).is_err() {
            backend.unclaim_channel(id);
            return Err(BackendError::NoChannel.into());
        }
        Ok(id)
    }

    fn acquire<B: ScanoutBackend>(
        &mut self,
        backend: &mut B,
        serializer: &SerializerConfig,
    ) -> Result<Channels, ConfigError> {
        let channels = Channels {
            stream: self.channel(backend, ChannelRole::Stream)?,
            display_list: self.channel(backend, ChannelRole::DisplayList)?,
            list_reset: self.channel(backend, ChannelRole::ListReset)?,
        };
        for role in IrqRole::ALL {
            backend.claim_interrupt(role)?;
            if self.interrupts.push(role).is_err() {
                backend.release_interrupt(role);
                return Err(BackendError::NoInterrupt.into());
            }
        }
        backend.configure_serializer(serializer)?;
        Ok(channels)
    }

    fn rollback<B: ScanoutBackend>(self, backend: &mut B) {
        for role in self.interrupts {
            backend.release_interrupt(role);
        }
        for id in self.channels {
            backend.unclaim_channel(id);
        }
    }
}

/// Claim every channel and interrupt line, or nothing.
fn claim_resources<B: ScanoutBackend>(backend: &mut B, serializer: &SerializerConfig) -> Result<Channels, ConfigError> {
    let mut claims = Claims::default();
    match claims.acquire(backend, serializer) {
        Ok(channels) => {
            for role in IrqRole::ALL {
                backend.enable(role, false);
                backend.set_priority(role, role.tier());
            }
            Ok(channels)
        }
        Err(e) => {
            warn!("scanout setup failed, releasing claims");
            claims.rollback(backend);
            Err(e)
        }
    }
}

/// Command words and splice point of a table.
fn table_of(tables: &LineTables, id: TableId) -> (&[u32], Option<usize>) {
    let table = match id {
        TableId::VsyncOn => &tables.vsync_on,
        TableId::VsyncOff => &tables.vsync_off,
        TableId::Border => &tables.border,
        TableId::Active => &tables.active,
        TableId::InfoPre => &tables.info_pre,
        TableId::Nop => &tables.nop,
        TableId::Info => return (tables.info.words(), tables.info.splice()),
    };
    (table.words(), table.splice())
}

/// Info packets of the first vertical blanking line: AVI, audio info frame,
/// clock regeneration and general control.
const INFO_PACKETS: usize = 4;

// ── Driver ───────────────────────────────────────────────────────────────────

/// Renderer in use and the one latched for the next frame.
struct Renderers<'a> {
    active: Option<&'a mut dyn LineRenderer>,
    pending: Option<&'a mut dyn LineRenderer>,
}

impl Renderers<'_> {
    fn latch(&mut self) {
        if let Some(renderer) = self.pending.take() {
            self.active = Some(renderer);
        }
    }
}

/// DVI / HDMI / VGA scanout driver.
pub struct Scanout<'a, B: ScanoutBackend> {
    backend: B,
    config: ScanoutConfig,
    timings: Timings,
    tables: LineTables,
    machine: StateMachine,
    pool: LinePool<'a>,
    ring: DescriptorRing,
    channels: Channels,
    renderers: Renderers<'a>,
    audio_clock: Option<AudioClock>,
    audio: Option<AudioPath<'a>>,
    audio_source: Option<&'a mut dyn AudioSource>,
}

impl<'a, B: ScanoutBackend> Scanout<'a, B> {
    /// Validate `config`, compile its tables and claim the backend
    /// resources. The driver starts idle.
    ///
    /// `line_buffer` must hold [`ScanoutConfig::line_buffer_words`] words.
    ///
    /// # Errors
    ///
    /// Every configuration problem is reported before the first backend
    /// call. A backend claim failure releases whatever was claimed before
    /// it, so a failed setup leaves the hardware untouched.
    #[allow(clippy::arithmetic_side_effects)] // Safety: line_rep checked non-zero; u16 word counts times LINE_SLOTS
    pub fn new(mut backend: B, config: ScanoutConfig, line_buffer: &'a mut [u32]) -> Result<Self, ConfigError> {
        let timings = config.timings.adjust(config.mode, config.pixel_rep, config.flags)?;
        let v = &timings.v;
        if v.sync == 0 || v.active == 0 || v.front_porch == 0 {
            return Err(ConfigError::VerticalBudget);
        }
        if config.line_rep == 0 || v.active % config.line_rep != 0 {
            return Err(ConfigError::LineRepetition {
                active: v.active,
                line_rep: config.line_rep,
            });
        }

        let hdmi = config.hdmi().copied();
        let audio_clock = match hdmi {
            Some(h) if h.has_audio() => Some(AudioClock::new(
                h.sample_rate,
                timings.pixel_clock,
                timings.h.total,
                timings.v.total,
            )?),
            _ => None,
        };

        let mut info: heapless::Vec<DataPacket, INFO_PACKETS> = heapless::Vec::new();
        if let Some(h) = hdmi {
            let audio = audio_clock.map(|c| [audio_infoframe(c.sample_rate), audio_clock_regeneration(c.cts, c.n)]);
            let packets = core::iter::once(avi_infoframe(h.avi, h.vic))
                .chain(audio.into_iter().flatten())
                .chain(core::iter::once(general_control(false)));
            for packet in packets {
                info.push(packet).map_err(|_| ConfigError::TableOverflow)?;
            }
        }
        let encoding = match config.output {
            Output::Dvi => LineEncoding::Dvi,
            Output::Hdmi(_) => LineEncoding::Hdmi {
                info: info.as_slice(),
                audio: audio_clock.is_some(),
            },
            Output::Vga => LineEncoding::Vga,
        };
        let tables = compile(&timings, encoding)?;

        let widths = timings.source_widths(config.source_pixel_rep());
        let words = config.mode.words_for(widths.active);
        let needed = usize::from(words) * LINE_SLOTS;
        let available = line_buffer.len();
        let source_lines = v.active / config.line_rep;
        let pool = LinePool::new(line_buffer, words, widths.active, source_lines)
            .ok_or(ConfigError::LineBufferTooSmall { needed, available })?;

        let serializer = config.mode.serializer_config(config.pixel_rep);
        let channels = claim_resources(&mut backend, &serializer)?;

        info!(
            "scanout {}x{} ({} mHz), h_total {} v_total {}",
            timings.h.active,
            timings.v.active,
            timings.refresh,
            timings.h.total,
            timings.v.total
        );
        if let Some(clock) = audio_clock {
            debug!(
                "HDMI audio {} Hz: N {} CTS {} add {} framesync {}",
                clock.sample_rate,
                clock.n,
                clock.cts,
                clock.add,
                clock.framesync_samples().is_some()
            );
        }

        Ok(Self {
            backend,
            machine: StateMachine::new(timings.v, config.line_rep, hdmi.is_some()),
            config,
            timings,
            tables,
            pool,
            ring: DescriptorRing::new(),
            channels,
            renderers: Renderers {
                active: None,
                pending: None,
            },
            audio_clock,
            audio: None,
            audio_source: None,
        })
    }

    /// Install the line renderer. While running the swap is latched and
    /// takes effect with the first render task of the next frame.
    pub fn set_renderer(&mut self, renderer: &'a mut dyn LineRenderer) {
        if self.is_running() {
            self.renderers.pending = Some(renderer);
        } else {
            self.renderers.active = Some(renderer);
        }
    }

    /// Attach the PCM ring and its producer. Only while stopped, and only
    /// for HDMI outputs with a non-zero sample rate.
    ///
    /// `buffer` holds interleaved stereo frames; its frame count must be a
    /// non-zero multiple of 4.
    pub fn attach_audio(&mut self, buffer: &'a mut [i16], source: &'a mut dyn AudioSource) -> Result<(), ConfigError> {
        if self.is_running() {
            return Err(ConfigError::NotIdle);
        }
        let clock = self.audio_clock.ok_or(ConfigError::AudioDisabled)?;
        self.audio = Some(AudioPath::new(buffer, clock, self.timings.polarity)?);
        self.audio_source = Some(source);
        Ok(())
    }

    /// Wire the chain, prefill both descriptor pairs and start streaming.
    ///
    /// From here until [`stop`](Self::stop) the driver must stay where it is.
    pub fn start(&mut self) -> Result<(), ConfigError> {
        if self.is_running() {
            return Err(ConfigError::NotIdle);
        }
        self.ring.reset();
        let chain = self
            .ring
            .chain_config(self.channels.stream, self.channels.display_list, self.channels.list_reset);
        let control = self.backend.configure_chain(&chain)?;
        self.ring.set_control(control);

        self.pool.reset();
        self.machine.start();
        if let Some(audio) = self.audio.as_mut() {
            audio.reset();
            if let Some(source) = self.audio_source.as_deref_mut() {
                audio.prime(source);
            }
        }

        let (mut irq, _, _) = self.split();
        for _ in 0..RECORDS / PAIR {
            irq.fill_pair();
        }

        for role in IrqRole::ALL {
            self.backend.enable(role, true);
        }
        self.backend.arm(self.channels.display_list);
        info!("scanout started");
        Ok(())
    }

    /// Stop streaming and return to [`ScanState::Idle`].
    ///
    /// A Tier-2 callback already running is not interrupted; it only cannot
    /// be raised again. Handles from [`split`](Self::split) must be dropped
    /// first.
    pub fn stop(&mut self) {
        for role in IrqRole::ALL {
            self.backend.enable(role, false);
        }
        for id in self.channels.all() {
            self.backend.abort(id);
        }
        self.machine.stop();
        self.pool.reset();
        self.renderers.latch();
        info!("scanout stopped after {} frames", self.machine.frame());
    }

    /// Stop, release every claimed resource and hand the backend back.
    pub fn release(mut self) -> B {
        self.stop();
        for role in IrqRole::ALL {
            self.backend.release_interrupt(role);
        }
        for id in self.channels.all() {
            self.backend.unclaim_channel(id);
        }
        self.backend
    }

    /// One handle per interrupt. See the module docs.
    pub fn split(&mut self) -> (ScanoutIrq<'_, B>, LineService<'_, 'a>, AudioService<'_, 'a>) {
        let (lines, slots) = self.pool.split();
        let (audio, writer) = match self.audio.as_mut() {
            Some(path) => {
                let (tx, writer) = path.split();
                (Some(tx), Some(writer))
            }
            None => (None, None),
        };
        (
            ScanoutIrq {
                backend: &mut self.backend,
                tables: &self.tables,
                machine: &mut self.machine,
                ring: &mut self.ring,
                lines,
                audio,
            },
            LineService {
                slots,
                renderers: &mut self.renderers,
            },
            AudioService {
                writer,
                source: self.audio_source.as_deref_mut(),
            },
        )
    }

    // ── Interrupt handlers ──────────────────────────────────────────────

    /// Tier 1: a descriptor pair has been consumed; refill it.
    pub fn on_dma_complete(&mut self) {
        self.split().0.on_dma_complete();
    }

    /// Tier 2: render the requested lines.
    pub fn on_line_render(&mut self) {
        self.split().1.on_line_render();
    }

    /// Tier 2: refill the half of the PCM ring the audio path asked for.
    pub fn on_audio_refill(&mut self) {
        self.split().2.on_audio_refill();
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Current phase.
    pub fn state(&self) -> ScanState {
        self.machine.state()
    }

    /// `true` unless idle.
    pub fn is_running(&self) -> bool {
        self.machine.state() != ScanState::Idle
    }

    /// Frames completed since [`start`](Self::start).
    pub fn frame_count(&self) -> u32 {
        self.machine.frame()
    }

    /// Lines emitted so far in the current frame.
    pub fn scanline(&self) -> u32 {
        self.machine.scanline()
    }

    /// Line refills dropped because the renderer was still busy.
    pub fn dropped_lines(&self) -> u32 {
        self.pool.dropped()
    }

    /// Pixel lines repeated from a stale slot because the renderer was late.
    pub fn late_lines(&self) -> u32 {
        self.pool.late_lines()
    }

    /// Audio counters, if audio is attached.
    pub fn audio_stats(&self) -> Option<AudioStats> {
        self.audio.as_ref().map(AudioPath::stats)
    }

    /// Audio path, if attached.
    pub fn audio(&self) -> Option<&AudioPath<'a>> {
        self.audio.as_ref()
    }

    /// Clock regeneration parameters of an HDMI audio output.
    pub fn audio_clock(&self) -> Option<&AudioClock> {
        self.audio_clock.as_ref()
    }

    /// Adjusted timings.
    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Configuration the driver was built from.
    pub fn config(&self) -> &ScanoutConfig {
        &self.config
    }

    /// Compiled line tables.
    pub fn tables(&self) -> &LineTables {
        &self.tables
    }

    /// Line pool state.
    pub fn pool(&self) -> &LinePool<'a> {
        &self.pool
    }

    /// Descriptor records as last written.
    pub fn records(&self) -> &[DmaDescriptor; RECORDS] {
        self.ring.records()
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably (host tests drive the mock through this).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

// ── Tier 1 ───────────────────────────────────────────────────────────────────

/// DMA completion handle: descriptor generation, line requests and audio
/// packet injection.
pub struct ScanoutIrq<'s, B: ScanoutBackend> {
    backend: &'s mut B,
    tables: &'s LineTables,
    machine: &'s mut StateMachine,
    ring: &'s mut DescriptorRing,
    lines: LineFeed<'s>,
    audio: Option<AudioTx<'s>>,
}

impl<B: ScanoutBackend> ScanoutIrq<'_, B> {
    /// A descriptor pair has been consumed; refill it.
    pub fn on_dma_complete(&mut self) {
        self.backend.acknowledge(IrqRole::DmaComplete);
        if self.is_running() {
            self.fill_pair();
        }
    }

    fn fill_pair(&mut self) {
        for index in 0..PAIR {
            let step = self.machine.advance(index);
            let (addr, words) = self.emit(&step);
            self.ring.write(index, addr, words);
        }
        self.ring.finish_pair();
    }

    /// Resolve one step into a record source and do its bookkeeping.
    #[allow(clippy::cast_possible_truncation)] // Safety: table and line lengths are far below u32::MAX
    fn emit(&mut self, step: &Step) -> (usize, u32) {
        let (mut addr, mut words) = match step.source {
            Source::Pixels => (self.lines.pixels_addr(), self.lines.words() as u32),
            Source::Table(id) => {
                let (table, splice) = table_of(self.tables, id);
                let mut emitted = (table.as_ptr() as usize, table.len() as u32);
                if let Some(audio) = self.audio.as_mut() {
                    if step.info_line {
                        audio.start_frame();
                    }
                    if let Some(splice) = splice {
                        if let Some(injection) = audio.on_line(table, splice, step.state.in_vertical_sync()) {
                            emitted = (injection.addr, injection.words);
                            if injection.refill {
                                self.backend.raise_pending(IrqRole::AudioRefill);
                            }
                        }
                    }
                }
                emitted
            }
        };

        if step.frame_start && self.lines.start_frame() {
            self.backend.raise_pending(IrqRole::LineRender);
        }
        if step.line_done && self.lines.advance() {
            self.backend.raise_pending(IrqRole::LineRender);
        }
        if words == 0 {
            // never hand the stream channel an empty transfer
            (addr, words) = (self.tables.nop.addr(), 1);
        }
        (addr, words)
    }

    /// Current phase.
    pub fn state(&self) -> ScanState {
        self.machine.state()
    }

    /// `true` unless idle.
    pub fn is_running(&self) -> bool {
        self.machine.state() != ScanState::Idle
    }

    /// Frames completed since start.
    pub fn frame_count(&self) -> u32 {
        self.machine.frame()
    }

    /// Line refills dropped because the renderer was still busy.
    pub fn dropped_lines(&self) -> u32 {
        self.lines.dropped()
    }

    /// The render task Tier 2 still owes, if any.
    pub fn outstanding(&self) -> Option<LineTask> {
        self.lines.outstanding()
    }

    /// Audio counters, if audio is attached.
    pub fn audio_stats(&self) -> Option<AudioStats> {
        self.audio.as_ref().map(AudioTx::stats)
    }

    /// Descriptor records as last written.
    pub fn records(&self) -> &[DmaDescriptor; RECORDS] {
        self.ring.records()
    }

    /// First record of the pair the next completion refills (0 or 2).
    pub fn next_pair(&self) -> usize {
        self.ring.next_pair()
    }

    /// The backend, mutably (host tests drive the mock through this).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut *self.backend
    }
}

// ── Tier 2 ───────────────────────────────────────────────────────────────────

/// Line render handle.
pub struct LineService<'s, 'a> {
    slots: LineSlots<'s>,
    renderers: &'s mut Renderers<'a>,
}

impl<'a> LineService<'_, 'a> {
    /// Render the requested lines. A renderer swap takes effect with the
    /// first task of a frame.
    pub fn on_line_render(&mut self) {
        let Some(task) = self.slots.take_task() else {
            return;
        };
        if task.new_frame {
            self.renderers.latch();
        }
        if let (Some(renderer), Some(dst)) = (self.renderers.active.as_deref_mut(), self.slots.region_mut(&task)) {
            renderer.render(&task, dst);
        }
        self.slots.complete();
    }

    /// Latch `renderer` for the next frame.
    pub fn set_renderer(&mut self, renderer: &'a mut dyn LineRenderer) {
        self.renderers.pending = Some(renderer);
    }
}

/// Audio refill handle.
pub struct AudioService<'s, 'a> {
    writer: Option<RingWriter<'s>>,
    source: Option<&'s mut (dyn AudioSource + 'a)>,
}

impl AudioService<'_, '_> {
    /// Refill the half of the PCM ring the audio path asked for. Returns
    /// `true` if the source was called.
    pub fn on_audio_refill(&mut self) -> bool {
        match (self.writer.as_mut(), self.source.as_deref_mut()) {
            (Some(writer), Some(source)) => audio_path::refill(writer, source),
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests use unwrap() for readable assertions
mod tests {
    use super::*;
    use platform::mocks::MockBackend;

    #[test]
    fn claims_beyond_capacity_are_returned() {
        let mut backend = MockBackend::new();
        let mut claims = Claims::default();
        for id in 0..3 {
            claims.channels.push(ChannelId(id)).unwrap();
        }
        // The backend grants the channel, but the claim list is full.
        assert_eq!(
            claims.channel(&mut backend, ChannelRole::Stream),
            Err(ConfigError::Backend(BackendError::NoChannel))
        );
        assert_eq!(backend.claimed_channels(), 0);
    }

    #[test]
    fn handles_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ScanoutIrq<'_, MockBackend>>();
        assert_send::<LineService<'_, '_>>();
        assert_send::<AudioService<'_, '_>>();
    }
}
