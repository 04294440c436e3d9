//! Info frames and the other once-per-frame control packets (CEA-861, HDMI 1.4).

use crate::packet::DataPacket;

// ── Packet types ─────────────────────────────────────────────────────────────

/// Audio clock regeneration packet type.
pub const TYPE_ACR: u8 = 0x01;
/// Audio sample packet type.
pub const TYPE_AUDIO_SAMPLE: u8 = 0x02;
/// General control packet type.
pub const TYPE_GENERAL_CONTROL: u8 = 0x03;
/// AVI info frame type.
pub const TYPE_AVI_INFOFRAME: u8 = 0x82;
/// Audio info frame type.
pub const TYPE_AUDIO_INFOFRAME: u8 = 0x84;

// ── AVI info frame ───────────────────────────────────────────────────────────

/// Coded picture aspect ratio (AVI byte 2, bits M1..M0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PictureAspect {
    /// No data.
    NoData,
    /// 4:3
    Aspect4x3,
    /// 16:9
    Aspect16x9,
}

impl PictureAspect {
    const fn code(self) -> u8 {
        match self {
            PictureAspect::NoData => 0,
            PictureAspect::Aspect4x3 => 1,
            PictureAspect::Aspect16x9 => 2,
        }
    }
}

/// The three flag bytes of an AVI info frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AviInfo {
    /// Colour format, active-format-present, bar and scan info.
    pub byte1: u8,
    /// Colorimetry, picture aspect, active format aspect.
    pub byte2: u8,
    /// IT content, extended colorimetry, quantisation range, scaling.
    pub byte3: u8,
}

impl AviInfo {
    /// RGB, no bar data, active format equal to the coded frame,
    /// default colorimetry and quantisation.
    pub const fn rgb(aspect: PictureAspect) -> Self {
        Self {
            // Y1:Y0 = 00 (RGB), A0 = 1 (active format present)
            byte1: 0x10,
            // C = 00, M = aspect, R = 1000 (same as picture)
            byte2: (aspect.code() << 4) | 0x08,
            byte3: 0,
        }
    }
}

/// AVI info frame (version 2, length 13).
pub fn avi_infoframe(info: AviInfo, vic: u8) -> DataPacket {
    let mut p = DataPacket::with_header(TYPE_AVI_INFOFRAME, 2, 13);
    p.subpackets[0][1] = info.byte1;
    p.subpackets[0][2] = info.byte2;
    p.subpackets[0][3] = info.byte3;
    p.subpackets[0][4] = vic;
    p.compute_infoframe_checksum();
    p.compute_parity();
    p
}

// ── Audio info frame ─────────────────────────────────────────────────────────

/// CEA-861 sample frequency code, or 0 ("refer to stream header") for
/// rates without one.
pub const fn sample_frequency_code(sample_rate: u32) -> u8 {
    match sample_rate {
        32_000 => 1,
        44_100 => 2,
        48_000 => 3,
        88_200 => 4,
        96_000 => 5,
        176_400 => 6,
        192_000 => 7,
        _ => 0,
    }
}

/// Audio info frame (version 1, length 10) for two-channel PCM.
pub fn audio_infoframe(sample_rate: u32) -> DataPacket {
    let mut p = DataPacket::with_header(TYPE_AUDIO_INFOFRAME, 1, 10);
    // CC = 1 (2 channels), CT = 0 (refer to stream header)
    p.subpackets[0][1] = 0x01;
    // SS = 0, SF from the rate
    p.subpackets[0][2] = sample_frequency_code(sample_rate) << 2;
    // CA = 0 (FL, FR), LSV = 0 dB, DM_INH = 0
    p.compute_infoframe_checksum();
    p.compute_parity();
    p
}

// ── Audio clock regeneration ─────────────────────────────────────────────────

/// Audio clock regeneration packet carrying `cts` and `n` (20 bits each).
pub fn audio_clock_regeneration(cts: u32, n: u32) -> DataPacket {
    let mut p = DataPacket::with_header(TYPE_ACR, 0, 0);
    let sp = &mut p.subpackets[0];
    sp[0] = 0;
    sp[1] = ((cts >> 16) & 0x0f) as u8;
    sp[2] = (cts >> 8) as u8;
    sp[3] = cts as u8;
    sp[4] = ((n >> 16) & 0x0f) as u8;
    sp[5] = (n >> 8) as u8;
    sp[6] = n as u8;
    p.compute_parity();
    p.replicate_subpacket0();
    p
}

// ── General control ──────────────────────────────────────────────────────────

/// General control packet setting (`true`) or clearing (`false`) AV mute.
pub fn general_control(av_mute: bool) -> DataPacket {
    let mut p = DataPacket::with_header(TYPE_GENERAL_CONTROL, 0, 0);
    p.subpackets[0][0] = if av_mute { 0x01 } else { 0x10 };
    p.compute_parity();
    p.replicate_subpacket0();
    p
}
