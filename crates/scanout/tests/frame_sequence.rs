//! Frame sequencing against the mock backend.
//!
//! The tests play the interrupt controller: every call to
//! `on_dma_complete` stands for the hardware finishing one descriptor pair,
//! and any Tier-2 line the driver raised is serviced before the next pair.
//!
//! Run with: cargo test -p scanout --test frame_sequence
#![allow(clippy::unwrap_used)] // Tests use unwrap() for readable assertions
#![allow(clippy::indexing_slicing, clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]

use std::sync::{Arc, Mutex};

use platform::mocks::{MockBackend, MOCK_CTRL_CONTINUE, MOCK_CTRL_WRAP, MOCK_FIFO_ADDR};
use platform::{DmaDescriptor, IrqPriority, IrqRole};
use scanout::{ConfigError, LineRenderer, LineTask, Output, ScanState, Scanout, VideoMode};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Renderer that writes each source line number into its slot and logs the
/// task.
#[derive(Default, Clone)]
struct Recorder {
    tasks: Arc<Mutex<Vec<LineTask>>>,
}

impl LineRenderer for Recorder {
    fn render(&mut self, task: &LineTask, dst: &mut [u32]) {
        for (row, line) in dst.chunks_mut(task.pitch).enumerate() {
            line.fill(u32::from(task.line) + row as u32);
        }
        self.tasks.lock().unwrap().push(*task);
    }
}

/// What a record streams, resolved against the driver's tables and pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emitted {
    VsyncOn,
    VsyncOff,
    Border,
    Active,
    Nop,
    Info,
    Pixels(usize),
    Other,
}

fn classify(scanout: &Scanout<'_, MockBackend>, record: &DmaDescriptor) -> Emitted {
    let tables = scanout.tables();
    let addr = record.read_addr;
    if let Some(slot) = (0..3).find(|&s| scanout.pool().slot_addr(s) == addr) {
        return Emitted::Pixels(slot);
    }
    if addr == tables.vsync_on.addr() {
        Emitted::VsyncOn
    } else if addr == tables.vsync_off.addr() {
        Emitted::VsyncOff
    } else if addr == tables.border.addr() {
        Emitted::Border
    } else if addr == tables.active.addr() {
        Emitted::Active
    } else if addr == tables.nop.addr() {
        Emitted::Nop
    } else if addr == tables.info_pre.addr() || addr == tables.info.addr() {
        Emitted::Info
    } else {
        Emitted::Other
    }
}

/// Records of pair `first` (0 or 2).
fn pair(scanout: &Scanout<'_, MockBackend>, first: usize) -> Vec<Emitted> {
    scanout.records()[first..first + 2]
        .iter()
        .map(|r| classify(scanout, r))
        .collect()
}

/// Service every Tier-2 line the driver raised.
fn service(scanout: &mut Scanout<'_, MockBackend>) {
    if scanout.backend_mut().take_pending(IrqRole::LineRender) {
        scanout.on_line_render();
    }
    if scanout.backend_mut().take_pending(IrqRole::AudioRefill) {
        scanout.on_audio_refill();
    }
}

/// Run until `frames` frames have completed; returns every record emitted
/// in order, including the two prefilled pairs.
fn run_frames(scanout: &mut Scanout<'_, MockBackend>, frames: u32) -> Vec<Emitted> {
    let mut emitted = pair(scanout, 0);
    emitted.extend(pair(scanout, 2));
    service(scanout);
    let mut next = 0;
    for _ in 0..100_000 {
        if scanout.frame_count() >= frames {
            return emitted;
        }
        scanout.on_dma_complete();
        emitted.extend(pair(scanout, next));
        next ^= 2;
        service(scanout);
    }
    panic!("scanout never completed {frames} frames");
}

fn count(emitted: &[Emitted], what: Emitted) -> usize {
    emitted.iter().filter(|&&e| e == what).count()
}

fn pixel_records(emitted: &[Emitted]) -> Vec<usize> {
    emitted
        .iter()
        .filter_map(|e| match e {
            Emitted::Pixels(slot) => Some(*slot),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[test]
fn test_setup_claims_three_channels_and_tiers() {
    let config = VideoMode::MODE_320X240.config(Output::Dvi);
    let mut lines = vec![0u32; config.line_buffer_words().unwrap()];
    let scanout = Scanout::new(MockBackend::new(), config, &mut lines).unwrap();

    let backend = scanout.backend();
    assert_eq!(backend.claimed_channels(), 3);
    assert_eq!(backend.priority(IrqRole::DmaComplete), Some(IrqPriority::Tier1));
    assert_eq!(backend.priority(IrqRole::LineRender), Some(IrqPriority::Tier2));
    assert_eq!(backend.priority(IrqRole::AudioRefill), Some(IrqPriority::Tier2));
    assert!(backend.serializer().is_some());
    assert!(backend.chain().is_none(), "chain is wired by start()");
    assert_eq!(scanout.state(), ScanState::Idle);
    assert_eq!(scanout.timings().refresh, 60_000);
}

#[test]
fn test_short_line_buffer_rejected_before_any_claim() {
    let config = VideoMode::MODE_320X240.config(Output::Dvi);
    let mut lines = vec![0u32; 959];
    let mut backend = MockBackend::new();
    let err = Scanout::new(&mut backend, config, &mut lines).err().unwrap();
    assert_eq!(
        err,
        ConfigError::LineBufferTooSmall {
            needed: 960,
            available: 959
        }
    );
    assert_eq!(backend.claimed_channels(), 0);
}

#[test]
fn test_line_repetition_must_divide_active_lines() {
    let mut config = VideoMode::MODE_640X480.config(Output::Dvi);
    config.line_rep = 7;
    let mut lines = vec![0u32; 2048];
    let err = Scanout::new(MockBackend::new(), config, &mut lines).err().unwrap();
    assert_eq!(err, ConfigError::LineRepetition { active: 480, line_rep: 7 });
}

#[test]
fn test_start_wires_chain_and_prefills_both_pairs() {
    let config = VideoMode::MODE_320X240.config(Output::Dvi);
    let mut lines = vec![0u32; config.line_buffer_words().unwrap()];
    let mut scanout = Scanout::new(MockBackend::new(), config, &mut lines).unwrap();
    scanout.start().unwrap();

    assert_eq!(scanout.start(), Err(ConfigError::NotIdle));
    let chain = scanout.backend().chain().unwrap();
    assert_eq!(chain.record_count, 4);
    assert_eq!(chain.records, scanout.records().as_ptr() as usize);
    assert_eq!(scanout.backend().armed(), &[chain.display_list]);
    for role in IrqRole::ALL {
        assert!(scanout.backend().is_enabled(role));
    }

    let records = scanout.records();
    for (i, r) in records.iter().enumerate() {
        assert_eq!(r.write_addr, MOCK_FIFO_ADDR);
        let ctrl = if i % 2 == 1 { MOCK_CTRL_WRAP } else { MOCK_CTRL_CONTINUE };
        assert_eq!(r.ctrl, ctrl, "record {i}");
    }
    // Two vertical sync lines then back porch.
    let tables = scanout.tables();
    assert_eq!(records[0].read_addr, tables.vsync_on.addr());
    assert_eq!(records[1].read_addr, tables.vsync_on.addr());
    assert_eq!(records[1].transfer_count, tables.vsync_on.len() as u32);
    assert_eq!(records[2].read_addr, tables.vsync_off.addr());
    // Sync ended inside the prefill: first render task is already posted.
    assert!(scanout.backend().is_pending(IrqRole::LineRender));
}

// ---------------------------------------------------------------------------
// Frame sequencing
// ---------------------------------------------------------------------------

/// 320x240 doubled into 640x480: two frames of sync, porches, one alignment
/// filler and 480 active lines drawn from 240 source lines.
#[test]
fn test_two_frames_of_320x240() {
    let config = VideoMode::MODE_320X240.config(Output::Dvi);
    let mut lines = vec![0u32; config.line_buffer_words().unwrap()];
    let mut renderer = Recorder::default();
    let log = renderer.tasks.clone();
    let mut scanout = Scanout::new(MockBackend::new(), config, &mut lines).unwrap();
    scanout.set_renderer(&mut renderer);
    scanout.start().unwrap();

    let emitted = run_frames(&mut scanout, 2);
    assert_eq!(scanout.frame_count(), 2);
    assert_eq!(scanout.scanline(), 0);

    let v = scanout.timings().v;
    assert_eq!(emitted.len(), 2 * 1006);
    assert_eq!(count(&emitted, Emitted::VsyncOn), 2 * usize::from(v.sync));
    assert_eq!(
        count(&emitted, Emitted::VsyncOff),
        2 * usize::from(v.back_porch + v.front_porch)
    );
    assert_eq!(count(&emitted, Emitted::Border), 0, "no borders in this mode");
    assert_eq!(count(&emitted, Emitted::Active), 2 * usize::from(v.active));
    assert_eq!(count(&emitted, Emitted::Nop), 2);
    assert_eq!(count(&emitted, Emitted::Other), 0);

    // Each source line is shown twice, from slot line % 3.
    let pixels = pixel_records(&emitted);
    assert_eq!(pixels.len(), 2 * usize::from(v.active));
    for (i, &slot) in pixels.iter().enumerate() {
        let source_line = (i / 2) % 240;
        assert_eq!(slot, source_line % 3, "pixel record {i}");
    }

    // Every source line rendered once per frame, in order, into its slot.
    let tasks = log.lock().unwrap();
    let frame_starts = tasks.iter().filter(|t| t.new_frame).count();
    assert_eq!(frame_starts, 2, "sync ends once per frame");
    let mut rendered = Vec::new();
    for task in tasks.iter() {
        assert_eq!(task.width, 320);
        assert_eq!(task.words, 320);
        for row in 0..task.height {
            let line = task.line + row;
            assert_eq!(task.slot + usize::from(row), usize::from(line) % 3);
            rendered.push(line);
        }
    }
    let expected: Vec<u16> = (0..240).chain(0..240).collect();
    assert_eq!(rendered, expected);
    assert_eq!(scanout.dropped_lines(), 0);
    assert!(scanout.pool().is_idle());
}

#[test]
fn test_letterbox_emits_border_lines() {
    let config = VideoMode::MODE_640X360.config(Output::Dvi);
    let mut lines = vec![0u32; config.line_buffer_words().unwrap()];
    let mut renderer = Recorder::default();
    let mut scanout = Scanout::new(MockBackend::new(), config, &mut lines).unwrap();
    scanout.set_renderer(&mut renderer);
    scanout.start().unwrap();

    let emitted = run_frames(&mut scanout, 1);
    assert_eq!(count(&emitted, Emitted::Border), 120);
    assert_eq!(pixel_records(&emitted).len(), 360);
    assert_eq!(scanout.dropped_lines(), 0);
}

#[test]
fn test_unserviced_renderer_drops_refills() {
    let config = VideoMode::MODE_640X480.config(Output::Dvi);
    let mut lines = vec![0u32; config.line_buffer_words().unwrap()];
    let mut scanout = Scanout::new(MockBackend::new(), config, &mut lines).unwrap();
    scanout.start().unwrap();

    // Never service the render interrupt: the first task stays outstanding.
    for _ in 0..600 {
        scanout.on_dma_complete();
    }
    assert!(scanout.dropped_lines() > 0);
    let task = scanout.pool().outstanding().unwrap();
    assert!(task.new_frame);
    assert_eq!(scanout.backend().raised_count(IrqRole::LineRender), 1);
}

/// Tier 2 runs one pair behind: every task is still owed when the line it
/// fills comes up. The display repeats a finished slot instead of streaming
/// one the renderer is writing.
#[test]
fn test_late_renderer_never_shares_a_slot_with_the_display() {
    let config = VideoMode::MODE_640X480.config(Output::Dvi);
    let mut lines = vec![0u32; config.line_buffer_words().unwrap()];
    let mut renderer = Recorder::default();
    let log = renderer.tasks.clone();
    let mut scanout = Scanout::new(MockBackend::new(), config, &mut lines).unwrap();
    scanout.set_renderer(&mut renderer);
    scanout.start().unwrap();
    let slot_addrs: Vec<usize> = (0..3).map(|s| scanout.pool().slot_addr(s)).collect();

    let (mut irq, mut line_irq, _) = scanout.split();
    let mut owed = false;
    let mut pixels = 0;
    while irq.frame_count() < 2 {
        irq.on_dma_complete();
        let written = irq.next_pair() ^ 2;
        for record in &irq.records()[written..written + 2] {
            if let Some(slot) = slot_addrs.iter().position(|&a| a == record.read_addr) {
                pixels += 1;
                if let Some(task) = irq.outstanding() {
                    assert!(!task.covers(slot), "pixel record {pixels} streams slot {slot} owed by {task:?}");
                }
            }
        }
        if owed {
            line_irq.on_line_render();
        }
        owed = irq.backend_mut().take_pending(IrqRole::LineRender);
    }
    assert!(irq.dropped_lines() > 0);
    assert!(pixels >= 480);
    let backend = irq.backend_mut();
    assert!(backend.acknowledged_count(IrqRole::DmaComplete) > 0);
    assert_eq!(backend.acknowledged_count(IrqRole::LineRender), 0, "software-raised lines need no acknowledge");

    assert!(scanout.late_lines() > 0);
    let tasks = log.lock().unwrap();
    assert_eq!(tasks.iter().filter(|t| t.new_frame).count(), 2);
}

#[test]
fn test_renderer_swap_latches_at_frame_start() {
    let config = VideoMode::MODE_320X240.config(Output::Dvi);
    let mut lines = vec![0u32; config.line_buffer_words().unwrap()];
    let mut first = Recorder::default();
    let mut second = Recorder::default();
    let (first_log, second_log) = (first.tasks.clone(), second.tasks.clone());
    let mut scanout = Scanout::new(MockBackend::new(), config, &mut lines).unwrap();
    scanout.set_renderer(&mut first);
    scanout.start().unwrap();
    service(&mut scanout);

    // Swap mid-frame: the rest of frame 0 still goes to the first renderer.
    for _ in 0..100 {
        scanout.on_dma_complete();
        service(&mut scanout);
    }
    scanout.set_renderer(&mut second);
    assert!(scanout.backend().is_enabled(IrqRole::DmaComplete));
    run_frames(&mut scanout, 1);
    let after_swap = first_log.lock().unwrap().len();
    assert!(second_log.lock().unwrap().is_empty());

    // Frame 1 starts with the second renderer.
    for _ in 0..10 {
        scanout.on_dma_complete();
        service(&mut scanout);
    }
    assert_eq!(first_log.lock().unwrap().len(), after_swap);
    assert!(second_log.lock().unwrap()[0].new_frame);
}

#[test]
fn test_stop_and_release() {
    let config = VideoMode::MODE_640X480.config(Output::Dvi);
    let mut lines = vec![0u32; config.line_buffer_words().unwrap()];
    let mut backend = MockBackend::new();
    let mut scanout = Scanout::new(&mut backend, config, &mut lines).unwrap();
    scanout.start().unwrap();
    scanout.on_dma_complete();

    scanout.stop();
    assert_eq!(scanout.state(), ScanState::Idle);
    assert_eq!(scanout.backend().aborted().len(), 3);
    for role in IrqRole::ALL {
        assert!(!scanout.backend().is_enabled(role));
    }
    let before = scanout.records()[0];
    scanout.on_dma_complete();
    assert_eq!(scanout.records()[0], before, "idle driver writes no records");

    // Restart from frame 0.
    scanout.start().unwrap();
    assert_eq!(scanout.frame_count(), 0);
    assert_eq!(scanout.state(), ScanState::BackPorch);

    drop(scanout.release());
    assert_eq!(backend.claimed_channels(), 0);
    for role in IrqRole::ALL {
        assert!(!backend.interrupt_claimed(role));
    }
}
