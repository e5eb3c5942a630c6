// SPDX-License-Identifier: GPL-2.0-or-later

#[cfg(test)]
mod test;

use thiserror::Error;

/*************************** Annex-B ****************************/

pub const ANNEXB_START_CODE: [u8; 4] = [0, 0, 0, 1];

// Replaces the 4-byte AVCC length prefix at the start of `nalu` with an
// Annex-B start code. Prefix and start code have the same length so the
// rewrite happens in place. Buffers shorter than a prefix are left alone.
pub fn avcc_to_annexb(nalu: &mut [u8]) {
    if let Some(prefix) = nalu.get_mut(..4) {
        prefix.copy_from_slice(&ANNEXB_START_CODE);
    }
}

/*************************** H.264 ****************************/

pub const H264_NALU_NON_IDR: u8 = 1;
pub const H264_NALU_PARTITION_A: u8 = 2;
pub const H264_NALU_PARTITION_B: u8 = 3;
pub const H264_NALU_PARTITION_C: u8 = 4;
pub const H264_NALU_IDR: u8 = 5;
pub const H264_NALU_SEI: u8 = 6;
pub const H264_NALU_SPS: u8 = 7;
pub const H264_NALU_PPS: u8 = 8;
pub const H264_NALU_AUD: u8 = 9;

// Type field from the first byte of a H.264 NAL unit.
#[must_use]
pub fn h264_nalu_type(header: u8) -> u8 {
    header & 0b0001_1111
}

#[must_use]
pub fn h264_is_vcl(nalu_type: u8) -> bool {
    (H264_NALU_NON_IDR..=H264_NALU_IDR).contains(&nalu_type)
}

#[must_use]
pub fn h264_is_idr(nalu_type: u8) -> bool {
    nalu_type == H264_NALU_IDR
}

#[must_use]
pub fn h264_is_parameter_set(nalu_type: u8) -> bool {
    nalu_type == H264_NALU_SPS || nalu_type == H264_NALU_PPS
}

/*************************** H.265 ****************************/

pub const H265_NALU_TRAIL_N: u8 = 0;
pub const H265_NALU_RASL_R: u8 = 9;
pub const H265_NALU_BLA_W_LP: u8 = 16;
pub const H265_NALU_CRA: u8 = 21;
pub const H265_NALU_VPS: u8 = 32;
pub const H265_NALU_SPS: u8 = 33;
pub const H265_NALU_PPS: u8 = 34;

// Type field from the first byte of a H.265 NAL unit header.
#[must_use]
pub fn h265_nalu_type(header: u8) -> u8 {
    (header >> 1) & 0b0011_1111
}

#[must_use]
pub fn h265_is_vcl(nalu_type: u8) -> bool {
    (H265_NALU_TRAIL_N..=H265_NALU_RASL_R).contains(&nalu_type) || h265_is_irap(nalu_type)
}

// BLA, IDR and CRA pictures. Decoding can restart here.
#[must_use]
pub fn h265_is_irap(nalu_type: u8) -> bool {
    (H265_NALU_BLA_W_LP..=H265_NALU_CRA).contains(&nalu_type)
}

#[must_use]
pub fn h265_is_parameter_set(nalu_type: u8) -> bool {
    (H265_NALU_VPS..=H265_NALU_PPS).contains(&nalu_type)
}

/******************* AVCDecoderConfigurationRecord *******************/

// Parsed `avcC` record. Parameter sets are stored as raw NAL units
// without any framing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AvcDecoderConfig {
    pub profile: u8,
    pub profile_compatibility: u8,
    pub level: u8,
    pub nalu_length_size: u8,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum ParseAvcConfigError {
    #[error("unexpected end of record")]
    UnexpectedEnd,

    #[error("unsupported configuration version: {0}")]
    Version(u8),
}

impl AvcDecoderConfig {
    pub fn parse(data: &[u8]) -> Result<Self, ParseAvcConfigError> {
        use ParseAvcConfigError::*;
        let mut r = RecordReader::new(data);

        let version = r.read_u8().ok_or(UnexpectedEnd)?;
        if version != 1 {
            return Err(Version(version));
        }
        let profile = r.read_u8().ok_or(UnexpectedEnd)?;
        let profile_compatibility = r.read_u8().ok_or(UnexpectedEnd)?;
        let level = r.read_u8().ok_or(UnexpectedEnd)?;
        let nalu_length_size = (r.read_u8().ok_or(UnexpectedEnd)? & 0b0000_0011) + 1;

        let num_sps = r.read_u8().ok_or(UnexpectedEnd)? & 0b0001_1111;
        let mut sps = Vec::new();
        for _ in 0..num_sps {
            let len = r.read_u16().ok_or(UnexpectedEnd)?;
            sps.push(r.read_slice(len.into()).ok_or(UnexpectedEnd)?.to_vec());
        }

        let num_pps = r.read_u8().ok_or(UnexpectedEnd)?;
        let mut pps = Vec::new();
        for _ in 0..num_pps {
            let len = r.read_u16().ok_or(UnexpectedEnd)?;
            pps.push(r.read_slice(len.into()).ok_or(UnexpectedEnd)?.to_vec());
        }

        Ok(Self {
            profile,
            profile_compatibility,
            level,
            nalu_length_size,
            sps,
            pps,
        })
    }

    // All parameter sets as a single Annex-B buffer, SPS first.
    #[must_use]
    pub fn parameter_sets_annexb(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for nalu in self.sps.iter().chain(self.pps.iter()) {
            out.extend_from_slice(&ANNEXB_START_CODE);
            out.extend_from_slice(nalu);
        }
        out
    }
}

/******************* HEVCDecoderConfigurationRecord *******************/

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HevcNaluArray {
    pub nalu_type: u8,
    pub nalus: Vec<Vec<u8>>,
}

// Parsed `hvcC` record. Only the NAL arrays and the length size are
// retained, the general profile fields are skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HevcDecoderConfig {
    pub nalu_length_size: u8,
    pub arrays: Vec<HevcNaluArray>,
}

#[derive(Debug, Error)]
pub enum ParseHevcConfigError {
    #[error("unexpected end of record")]
    UnexpectedEnd,

    #[error("unsupported configuration version: {0}")]
    Version(u8),
}

impl HevcDecoderConfig {
    pub fn parse(data: &[u8]) -> Result<Self, ParseHevcConfigError> {
        use ParseHevcConfigError::*;
        let mut r = RecordReader::new(data);

        let version = r.read_u8().ok_or(UnexpectedEnd)?;
        if version != 1 {
            return Err(Version(version));
        }
        // General profile, level and chroma fields up to lengthSizeMinusOne.
        r.read_slice(20).ok_or(UnexpectedEnd)?;
        let nalu_length_size = (r.read_u8().ok_or(UnexpectedEnd)? & 0b0000_0011) + 1;

        let num_arrays = r.read_u8().ok_or(UnexpectedEnd)?;
        let mut arrays = Vec::new();
        for _ in 0..num_arrays {
            let nalu_type = r.read_u8().ok_or(UnexpectedEnd)? & 0b0011_1111;
            let num_nalus = r.read_u16().ok_or(UnexpectedEnd)?;
            let mut nalus = Vec::new();
            for _ in 0..num_nalus {
                let len = r.read_u16().ok_or(UnexpectedEnd)?;
                nalus.push(r.read_slice(len.into()).ok_or(UnexpectedEnd)?.to_vec());
            }
            arrays.push(HevcNaluArray { nalu_type, nalus });
        }

        Ok(Self {
            nalu_length_size,
            arrays,
        })
    }

    // All stored NAL units as a single Annex-B buffer, in record order.
    // Encoders emit the arrays as VPS, SPS, PPS.
    #[must_use]
    pub fn parameter_sets_annexb(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for array in &self.arrays {
            for nalu in &array.nalus {
                out.extend_from_slice(&ANNEXB_START_CODE);
                out.extend_from_slice(nalu);
            }
        }
        out
    }
}

/*********************** AudioSpecificConfig ************************/

const SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

// The first two bytes of an AudioSpecificConfig as stored in `esds`.
// Escape encodings (object type 31, explicit frequency) are rejected,
// they do not occur for the plain AAC profiles this crate handles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    pub object_type: u8,
    pub frequency_index: u8,
    pub sample_rate: u32,
    pub channel_config: u8,
}

#[derive(Debug, Error)]
pub enum ParseAscError {
    #[error("config is shorter than two bytes")]
    TooShort,

    #[error("unsupported audio object type: {0}")]
    ObjectType(u8),

    #[error("unsupported sampling frequency index: {0}")]
    FrequencyIndex(u8),

    #[error("unsupported channel configuration: {0}")]
    ChannelConfig(u8),
}

impl AudioSpecificConfig {
    pub fn parse(data: &[u8]) -> Result<Self, ParseAscError> {
        use ParseAscError::*;
        if data.len() < 2 {
            return Err(TooShort);
        }
        let (b0, b1) = (data[0], data[1]);

        let object_type = b0 >> 3;
        if object_type == 0 || object_type == 31 {
            return Err(ObjectType(object_type));
        }

        let frequency_index = (b0 & 0b0000_0111) << 1 | b1 >> 7;
        let sample_rate = *SAMPLE_RATES
            .get(usize::from(frequency_index))
            .ok_or(FrequencyIndex(frequency_index))?;

        let channel_config = (b1 >> 3) & 0b0000_1111;
        if channel_config == 0 || channel_config > 7 {
            return Err(ChannelConfig(channel_config));
        }

        Ok(Self {
            object_type,
            frequency_index,
            sample_rate,
            channel_config,
        })
    }

    // Synthesizes the 7-byte ADTS header for one raw AAC frame.
    // `frame_len` counts the header itself, so seven plus the payload.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn adts_header(&self, frame_len: usize) -> Result<[u8; 7], AdtsHeaderError> {
        use AdtsHeaderError::*;
        // 13-bit field.
        if frame_len >= 1 << 13 {
            return Err(FrameTooLarge(frame_len));
        }
        // The two profile bits encode object type minus one.
        if self.object_type == 0 || self.object_type > 4 {
            return Err(ObjectType(self.object_type));
        }
        let profile = self.object_type - 1;

        Ok([
            0xff,
            0xf1, // MPEG-4, layer 0, no CRC.
            (profile & 0b0000_0011) << 6
                | (self.frequency_index & 0b0000_1111) << 2
                | (self.channel_config >> 2) & 1,
            (self.channel_config & 0b0000_0011) << 6 | ((frame_len >> 11) & 0b0000_0011) as u8,
            ((frame_len >> 3) & 0xff) as u8,
            ((frame_len & 0b0000_0111) as u8) << 5 | 0b0001_1111, // Buffer fullness.
            0xfc, // One AAC frame per ADTS frame.
        ])
    }
}

#[derive(Debug, Error)]
pub enum AdtsHeaderError {
    #[error("frame length {0} does not fit the 13-bit field")]
    FrameTooLarge(usize),

    #[error("audio object type {0} cannot be expressed in ADTS")]
    ObjectType(u8),
}

/*************************** record reader ****************************/

// Bounds-checked cursor over a configuration record.
struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_u8(&mut self) -> Option<u8> {
        let b = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn read_u16(&mut self) -> Option<u16> {
        let b = self.buf.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_slice(&mut self, len: usize) -> Option<&'a [u8]> {
        let b = self.buf.get(self.pos..self.pos.checked_add(len)?)?;
        self.pos += len;
        Some(b)
    }
}
