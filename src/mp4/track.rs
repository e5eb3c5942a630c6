#![allow(clippy::module_name_repetitions)]

use codec::{AvcDecoderConfig, HevcDecoderConfig};

use crate::error::BuildSampleListError;

// Elementary stream type of a track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CodecId {
    H264,
    H265,
    Aac,
    G711Alaw,
    G711Ulaw,
    #[default]
    Unknown,
}

impl CodecId {
    #[must_use]
    pub fn is_video(self) -> bool {
        matches!(self, CodecId::H264 | CodecId::H265)
    }
}

// Decoder parameters from the sample description. The variant is fixed
// by the sample entry type for the lifetime of the track.
#[derive(Clone, Debug, Default)]
pub(crate) enum TrackExtra {
    H264(AvcDecoderConfig),
    H265(HevcDecoderConfig),
    Aac {
        asc: Vec<u8>,
    },
    #[default]
    None,
}

// One sample with every table flattened into it. Timestamps are in the
// track timescale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleEntry {
    pub offset: u64,
    pub size: u64,
    pub dts: u64,
    pub pts: u64,
}

// Descriptive track metadata returned by `read_head`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub track_id: u32,
    pub codec: CodecId,
    // Handler type from the hdlr box, e.g. "vide" or "soun".
    pub handler_type: [u8; 4],
    pub duration: u64,
    pub timescale: u32,
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub sample_bits: u16,
    pub channel_count: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CttsEntry {
    pub sample_count: u32,
    // Signed when the box version is 1.
    pub sample_offset: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    #[allow(dead_code)]
    pub sample_description_index: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Stsz {
    pub sample_size: u32,
    pub sample_count: u32,
    pub entry_sizes: Vec<u32>,
}

// Raw side tables collected while walking the sample table box.
#[derive(Clone, Debug, Default)]
pub(crate) struct SideTables {
    pub stts: Option<Vec<SttsEntry>>,
    pub ctts: Option<Vec<CttsEntry>>,
    pub stsc: Option<Vec<StscEntry>>,
    pub stsz: Option<Stsz>,
    // From either stco or co64.
    pub chunk_offsets: Option<Vec<u64>>,
}

#[derive(Debug, Default)]
pub(crate) struct Track {
    pub track_id: u32,
    pub codec: CodecId,
    pub handler: [u8; 4],
    pub duration: u64,
    pub timescale: u32,
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub sample_bits: u16,
    pub channel_count: u8,
    pub extra: TrackExtra,
    pub stbl: Option<SideTables>,
    pub samples: Vec<SampleEntry>,
}

impl Track {
    pub(crate) fn info(&self) -> TrackInfo {
        TrackInfo {
            track_id: self.track_id,
            codec: self.codec,
            handler_type: self.handler,
            duration: self.duration,
            timescale: self.timescale,
            width: self.width,
            height: self.height,
            sample_rate: self.sample_rate,
            sample_bits: self.sample_bits,
            channel_count: self.channel_count,
        }
    }

    // Fuses the side tables into the flat sample list. Counts that
    // disagree between tables clip the list instead of failing, only a
    // missing table is an error.
    pub(crate) fn build_sample_list(&mut self) -> Result<(), BuildSampleListError> {
        use BuildSampleListError::*;
        let Some(stbl) = &self.stbl else {
            return Err(MissingTable("stbl"));
        };
        let stts = stbl.stts.as_ref().ok_or(MissingTable("stts"))?;
        let stsc = stbl.stsc.as_ref().ok_or(MissingTable("stsc"))?;
        let stsz = stbl.stsz.as_ref().ok_or(MissingTable("stsz"))?;
        let chunk_offsets = stbl
            .chunk_offsets
            .as_ref()
            .ok_or(MissingTable("stco/co64"))?;

        // Expand the chunk map: each stsc run applies from its first
        // chunk up to the next run's first chunk.
        let mut samples_per_chunk = Vec::with_capacity(chunk_offsets.len());
        let mut run = 0;
        for i in 0..chunk_offsets.len() {
            let chunk_num = u32::try_from(i + 1).unwrap_or(u32::MAX);
            while run + 1 < stsc.len() && stsc[run + 1].first_chunk <= chunk_num {
                run += 1;
            }
            samples_per_chunk.push(stsc.get(run).map_or(0, |e| e.samples_per_chunk));
        }

        let declared = usize::try_from(stsz.sample_count)?;
        let count = if stsz.sample_size == 0 {
            declared.min(stsz.entry_sizes.len())
        } else {
            declared
        };

        let mut samples = vec![SampleEntry::default(); count];
        for (i, sample) in samples.iter_mut().enumerate() {
            sample.size = if stsz.sample_size == 0 {
                u64::from(stsz.entry_sizes[i])
            } else {
                u64::from(stsz.sample_size)
            };
        }

        // Samples are laid out back to back inside each chunk.
        let mut idx = 0;
        'chunks: for (chunk, &offset) in chunk_offsets.iter().enumerate() {
            let mut pos = offset;
            for _ in 0..samples_per_chunk[chunk] {
                if idx == samples.len() {
                    break 'chunks;
                }
                samples[idx].offset = pos;
                pos = pos.saturating_add(samples[idx].size);
                idx += 1;
            }
        }
        // The chunk map covered fewer samples than stsz declared.
        samples.truncate(idx);

        // Decode timestamps accumulate the stts deltas, starting at zero.
        let mut dts: u64 = 0;
        let mut idx = 0;
        'stts: for entry in stts {
            for _ in 0..entry.sample_count {
                if idx == samples.len() {
                    break 'stts;
                }
                samples[idx].dts = dts;
                samples[idx].pts = dts;
                dts = dts.saturating_add(u64::from(entry.sample_delta));
                idx += 1;
            }
        }

        // Composition offsets shift pts away from dts where present.
        if let Some(ctts) = &stbl.ctts {
            let mut idx = 0;
            'ctts: for entry in ctts {
                for _ in 0..entry.sample_count {
                    if idx == samples.len() {
                        break 'ctts;
                    }
                    samples[idx].pts = samples[idx].dts.saturating_add_signed(entry.sample_offset);
                    idx += 1;
                }
            }
        }

        self.samples = samples;
        Ok(())
    }
}
