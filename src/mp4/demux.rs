use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::{
    error::{EsdsError, ReadHeadError, ReadPacketError},
    fourcc_str, read_fourcc, read_i32, read_u16, read_u32, read_u64, read_vec,
    track::{
        CodecId, CttsEntry, SampleEntry, SideTables, StscEntry, Stsz, SttsEntry, Track, TrackExtra,
        TrackInfo,
    },
    BoxHeader, BoxType, FullBox, TYPE_ALAW, TYPE_AVC1, TYPE_AVCC, TYPE_CO64, TYPE_CTTS, TYPE_DINF,
    TYPE_ESDS, TYPE_FREE, TYPE_FTYP, TYPE_HDLR, TYPE_HMHD, TYPE_HVC1, TYPE_HVCC, TYPE_MDAT,
    TYPE_MDHD, TYPE_MDIA, TYPE_MINF, TYPE_MOOV, TYPE_MP4A, TYPE_MVHD, TYPE_NMHD, TYPE_SMHD,
    TYPE_STBL, TYPE_STCO, TYPE_STSC, TYPE_STSD, TYPE_STSZ, TYPE_STTS, TYPE_TKHD, TYPE_TRAK,
    TYPE_UDTA, TYPE_ULAW, TYPE_VMHD,
};

// File level metadata from the ftyp and mvhd boxes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub major_brand: [u8; 4],
    pub minor_version: u32,
    pub compatible_brands: Vec<[u8; 4]>,
    pub timescale: u32,
    pub duration: u64,
    pub creation_time: u64,
    pub modification_time: u64,
}

// One demultiplexed frame. Timestamps are in the movie timescale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub codec: CodecId,
    pub track_id: u32,
    pub pts: u64,
    pub dts: u64,
    pub data: Vec<u8>,
}

// Per track streaming state.
#[derive(Default)]
struct ReadCursor {
    next_sample: usize,
    // Parameter sets carried by earlier samples, waiting for the next
    // random access point on this track.
    pending_params: Vec<u8>,
}

// Pull based demuxer for plain (non-fragmented) mp4 files.
//
// Usage: `read_head` once, then `read_packet` until it returns None.
pub struct Mp4Demuxer<R: Read + Seek> {
    rdr: R,
    info: FileInfo,
    tracks: Vec<Track>,
    mdat_offsets: Vec<u64>,
    // Some once read_head has succeeded.
    cursors: Option<Vec<ReadCursor>>,
}

impl<R: Read + Seek> Mp4Demuxer<R> {
    #[must_use]
    pub fn new(rdr: R) -> Self {
        Self {
            rdr,
            info: FileInfo::default(),
            tracks: Vec::new(),
            mdat_offsets: Vec::new(),
            cursors: None,
        }
    }

    // Walks the box tree, collects the movie metadata and builds the per
    // track sample lists. Calling it again after success is a no-op that
    // returns the same track list.
    pub fn read_head(&mut self) -> Result<Vec<TrackInfo>, ReadHeadError> {
        if self.cursors.is_some() {
            return Ok(self.tracks.iter().map(Track::info).collect());
        }

        while let Some(header) = BoxHeader::read_from(&mut self.rdr)? {
            self.read_box(&header)?;
        }

        if self.info.timescale == 0 {
            return Err(ReadHeadError::MovieTimescale);
        }
        for track in &mut self.tracks {
            if track.timescale == 0 {
                return Err(ReadHeadError::TrackTimescale(track.track_id));
            }
            track
                .build_sample_list()
                .map_err(|e| ReadHeadError::SampleTables(track.track_id, e))?;
        }

        self.cursors = Some(self.tracks.iter().map(|_| ReadCursor::default()).collect());
        Ok(self.tracks.iter().map(Track::info).collect())
    }

    // Valid after `read_head` has succeeded.
    #[must_use]
    pub fn file_info(&self) -> &FileInfo {
        &self.info
    }

    // Body offsets of every mdat box in file order.
    #[must_use]
    pub fn mdat_offsets(&self) -> &[u64] {
        &self.mdat_offsets
    }

    fn read_box(&mut self, header: &BoxHeader) -> Result<(), ReadHeadError> {
        if header.size != 0 && header.size < header.header_len {
            return Err(ReadHeadError::BoxSize(
                fourcc_str(&header.box_type),
                header.size,
            ));
        }

        // Containers and sample descriptions leave the walk inside their
        // children, ancestry stays implicit in box order.
        match header.box_type {
            TYPE_MOOV => return self.check_moov_fits(header),
            TYPE_TRAK => {
                self.tracks.push(Track::default());
                return Ok(());
            }
            TYPE_MDIA | TYPE_MINF | TYPE_DINF | TYPE_UDTA => return Ok(()),
            TYPE_STBL => {
                self.current_track(&TYPE_STBL)?.stbl = Some(SideTables::default());
                return Ok(());
            }
            TYPE_STSD => {
                FullBox::read_from(&mut self.rdr)?;
                read_u32(&mut self.rdr)?; // Entry count.
                return Ok(());
            }
            TYPE_AVC1 => return self.read_visual_sample_entry(&TYPE_AVC1, CodecId::H264),
            TYPE_HVC1 => return self.read_visual_sample_entry(&TYPE_HVC1, CodecId::H265),
            TYPE_MP4A => return self.read_audio_sample_entry(&TYPE_MP4A, CodecId::Aac),
            TYPE_ALAW => return self.read_audio_sample_entry(&TYPE_ALAW, CodecId::G711Alaw),
            TYPE_ULAW => return self.read_audio_sample_entry(&TYPE_ULAW, CodecId::G711Ulaw),
            _ => {}
        }

        // Everything else is a leaf. Decode the fields we care about,
        // then reposition to the end of the box.
        let payload_start = self.rdr.stream_position().map_err(ReadHeadError::Read)?;
        match header.box_type {
            TYPE_FTYP => self.read_ftyp(header)?,
            TYPE_MVHD => self.read_mvhd()?,
            TYPE_TKHD => self.read_tkhd()?,
            TYPE_MDHD => self.read_mdhd()?,
            TYPE_HDLR => self.read_hdlr()?,
            TYPE_VMHD | TYPE_SMHD | TYPE_HMHD | TYPE_NMHD => {
                FullBox::read_from(&mut self.rdr)?;
            }
            TYPE_STTS => self.read_stts()?,
            TYPE_CTTS => self.read_ctts()?,
            TYPE_STSC => self.read_stsc()?,
            TYPE_STSZ => self.read_stsz()?,
            TYPE_STCO => self.read_stco()?,
            TYPE_CO64 => self.read_co64()?,
            TYPE_AVCC => self.read_avcc(header)?,
            TYPE_HVCC => self.read_hvcc(header)?,
            TYPE_ESDS => self.read_esds(header)?,
            TYPE_MDAT => self.mdat_offsets.push(payload_start),
            TYPE_FREE => {}
            _ => debug!(
                "skipping unknown box '{}' ({} bytes)",
                fourcc_str(&header.box_type),
                header.size
            ),
        }

        if header.size == 0 {
            // Box extends to the end of the file.
            self.rdr
                .seek(SeekFrom::End(0))
                .map_err(ReadHeadError::Read)?;
        } else {
            let end = payload_start.saturating_add(header.payload_size());
            self.rdr
                .seek(SeekFrom::Start(end))
                .map_err(ReadHeadError::Read)?;
        }
        Ok(())
    }

    // One-shot probe: a moov declaring more bytes than the file holds
    // cannot be walked.
    fn check_moov_fits(&mut self, header: &BoxHeader) -> Result<(), ReadHeadError> {
        if header.size == 0 {
            return Ok(());
        }
        let current = self.rdr.stream_position().map_err(ReadHeadError::Read)?;
        let end = self
            .rdr
            .seek(SeekFrom::End(0))
            .map_err(ReadHeadError::Read)?;
        let remaining = end.saturating_sub(current);
        let declared = header.payload_size();
        if remaining < declared {
            return Err(ReadHeadError::Incomplete(declared - remaining));
        }
        self.rdr
            .seek(SeekFrom::Start(current))
            .map_err(ReadHeadError::Read)?;
        Ok(())
    }

    fn current_track(&mut self, box_type: &BoxType) -> Result<&mut Track, ReadHeadError> {
        self.tracks
            .last_mut()
            .ok_or_else(|| ReadHeadError::BoxOutsideTrack(fourcc_str(box_type)))
    }

    fn current_stbl(&mut self, box_type: &BoxType) -> Result<&mut SideTables, ReadHeadError> {
        self.current_track(box_type)?
            .stbl
            .as_mut()
            .ok_or_else(|| ReadHeadError::BoxOutsideStbl(fourcc_str(box_type)))
    }

    fn read_ftyp(&mut self, header: &BoxHeader) -> Result<(), ReadHeadError> {
        self.info.major_brand = read_fourcc(&mut self.rdr)?;
        self.info.minor_version = read_u32(&mut self.rdr)?;
        let num_brands = header.payload_size().saturating_sub(8) / 4;
        for _ in 0..num_brands {
            let brand = read_fourcc(&mut self.rdr)?;
            self.info.compatible_brands.push(brand);
        }
        Ok(())
    }

    fn read_mvhd(&mut self) -> Result<(), ReadHeadError> {
        let full = FullBox::read_from(&mut self.rdr)?;
        if full.version == 1 {
            self.info.creation_time = read_u64(&mut self.rdr)?;
            self.info.modification_time = read_u64(&mut self.rdr)?;
            self.info.timescale = read_u32(&mut self.rdr)?;
            self.info.duration = read_u64(&mut self.rdr)?;
        } else {
            self.info.creation_time = read_u32(&mut self.rdr)?.into();
            self.info.modification_time = read_u32(&mut self.rdr)?.into();
            self.info.timescale = read_u32(&mut self.rdr)?;
            self.info.duration = read_u32(&mut self.rdr)?.into();
        }
        // Rate, volume, matrix and next track id are not interesting.
        Ok(())
    }

    fn read_tkhd(&mut self) -> Result<(), ReadHeadError> {
        let full = FullBox::read_from(&mut self.rdr)?;
        let track_id = if full.version == 1 {
            read_u64(&mut self.rdr)?; // Creation time.
            read_u64(&mut self.rdr)?; // Modification time.
            let track_id = read_u32(&mut self.rdr)?;
            read_u32(&mut self.rdr)?; // Reserved.
            read_u64(&mut self.rdr)?; // Duration, mdhd is authoritative.
            track_id
        } else {
            read_u32(&mut self.rdr)?;
            read_u32(&mut self.rdr)?;
            let track_id = read_u32(&mut self.rdr)?;
            read_u32(&mut self.rdr)?;
            read_u32(&mut self.rdr)?;
            track_id
        };
        // Reserved, layer, alternate group, volume and matrix.
        read_vec(&mut self.rdr, 52)?;
        // 16.16 fixed point, zero for audio tracks.
        let width = read_u32(&mut self.rdr)? >> 16;
        let height = read_u32(&mut self.rdr)? >> 16;

        let track = self.current_track(&TYPE_TKHD)?;
        track.track_id = track_id;
        track.width = width;
        track.height = height;
        Ok(())
    }

    fn read_mdhd(&mut self) -> Result<(), ReadHeadError> {
        let full = FullBox::read_from(&mut self.rdr)?;
        let (timescale, duration) = if full.version == 1 {
            read_u64(&mut self.rdr)?;
            read_u64(&mut self.rdr)?;
            let timescale = read_u32(&mut self.rdr)?;
            (timescale, read_u64(&mut self.rdr)?)
        } else {
            read_u32(&mut self.rdr)?;
            read_u32(&mut self.rdr)?;
            let timescale = read_u32(&mut self.rdr)?;
            (timescale, read_u32(&mut self.rdr)?.into())
        };

        let track = self.current_track(&TYPE_MDHD)?;
        track.timescale = timescale;
        track.duration = duration;
        Ok(())
    }

    fn read_hdlr(&mut self) -> Result<(), ReadHeadError> {
        FullBox::read_from(&mut self.rdr)?;
        read_u32(&mut self.rdr)?; // Pre-defined.
        let handler = read_fourcc(&mut self.rdr)?;
        self.current_track(&TYPE_HDLR)?.handler = handler;
        Ok(())
    }

    // The shared prefix of every sample entry: six reserved bytes and the
    // data reference index.
    fn read_sample_entry_prefix(&mut self) -> Result<(), ReadHeadError> {
        read_vec(&mut self.rdr, 6)?;
        read_u16(&mut self.rdr)?;
        Ok(())
    }

    fn read_visual_sample_entry(
        &mut self,
        box_type: &BoxType,
        codec: CodecId,
    ) -> Result<(), ReadHeadError> {
        self.read_sample_entry_prefix()?;
        read_vec(&mut self.rdr, 16)?; // Pre-defined and reserved.
        let width = read_u16(&mut self.rdr)?;
        let height = read_u16(&mut self.rdr)?;
        // Resolution, frame count, compressor name, depth, pre-defined.
        read_vec(&mut self.rdr, 50)?;

        let track = self.current_track(box_type)?;
        track.codec = codec;
        track.width = width.into();
        track.height = height.into();
        // The avcC/hvcC child follows inside this entry.
        Ok(())
    }

    fn read_audio_sample_entry(
        &mut self,
        box_type: &BoxType,
        codec: CodecId,
    ) -> Result<(), ReadHeadError> {
        self.read_sample_entry_prefix()?;
        read_vec(&mut self.rdr, 8)?; // Reserved.
        let channel_count = read_u16(&mut self.rdr)?;
        let sample_bits = read_u16(&mut self.rdr)?;
        read_vec(&mut self.rdr, 4)?; // Pre-defined and reserved.
        let sample_rate = read_u32(&mut self.rdr)? >> 16; // 16.16 fixed point.

        let track = self.current_track(box_type)?;
        track.codec = codec;
        track.channel_count = u8::try_from(channel_count).unwrap_or(u8::MAX);
        track.sample_bits = sample_bits;
        track.sample_rate = sample_rate;
        // The esds child follows inside this entry for AAC.
        Ok(())
    }

    fn read_avcc(&mut self, header: &BoxHeader) -> Result<(), ReadHeadError> {
        let payload_size = usize::try_from(header.payload_size())
            .map_err(|_| ReadHeadError::BoxSize(fourcc_str(&TYPE_AVCC), header.size))?;
        let payload = read_vec(&mut self.rdr, payload_size)?;
        let config = codec::AvcDecoderConfig::parse(&payload)?;
        self.current_track(&TYPE_AVCC)?.extra = TrackExtra::H264(config);
        Ok(())
    }

    fn read_hvcc(&mut self, header: &BoxHeader) -> Result<(), ReadHeadError> {
        let payload_size = usize::try_from(header.payload_size())
            .map_err(|_| ReadHeadError::BoxSize(fourcc_str(&TYPE_HVCC), header.size))?;
        let payload = read_vec(&mut self.rdr, payload_size)?;
        let config = codec::HevcDecoderConfig::parse(&payload)?;
        self.current_track(&TYPE_HVCC)?.extra = TrackExtra::H265(config);
        Ok(())
    }

    fn read_esds(&mut self, header: &BoxHeader) -> Result<(), ReadHeadError> {
        let payload_size = usize::try_from(header.payload_size())
            .map_err(|_| ReadHeadError::BoxSize(fourcc_str(&TYPE_ESDS), header.size))?;
        let payload = read_vec(&mut self.rdr, payload_size)?;
        let asc = parse_esds(&payload)?;
        self.current_track(&TYPE_ESDS)?.extra = TrackExtra::Aac { asc };
        Ok(())
    }

    fn read_stts(&mut self) -> Result<(), ReadHeadError> {
        FullBox::read_from(&mut self.rdr)?;
        let count = read_u32(&mut self.rdr)?;
        let mut entries = Vec::new();
        for _ in 0..count {
            entries.push(SttsEntry {
                sample_count: read_u32(&mut self.rdr)?,
                sample_delta: read_u32(&mut self.rdr)?,
            });
        }
        self.current_stbl(&TYPE_STTS)?.stts = Some(entries);
        Ok(())
    }

    fn read_ctts(&mut self) -> Result<(), ReadHeadError> {
        let full = FullBox::read_from(&mut self.rdr)?;
        let count = read_u32(&mut self.rdr)?;
        let mut entries = Vec::new();
        for _ in 0..count {
            let sample_count = read_u32(&mut self.rdr)?;
            // Unsigned in version 0, signed in version 1.
            let sample_offset = if full.version == 1 {
                i64::from(read_i32(&mut self.rdr)?)
            } else {
                i64::from(read_u32(&mut self.rdr)?)
            };
            entries.push(CttsEntry {
                sample_count,
                sample_offset,
            });
        }
        self.current_stbl(&TYPE_CTTS)?.ctts = Some(entries);
        Ok(())
    }

    fn read_stsc(&mut self) -> Result<(), ReadHeadError> {
        FullBox::read_from(&mut self.rdr)?;
        let count = read_u32(&mut self.rdr)?;
        let mut entries = Vec::new();
        for _ in 0..count {
            entries.push(StscEntry {
                first_chunk: read_u32(&mut self.rdr)?,
                samples_per_chunk: read_u32(&mut self.rdr)?,
                sample_description_index: read_u32(&mut self.rdr)?,
            });
        }
        self.current_stbl(&TYPE_STSC)?.stsc = Some(entries);
        Ok(())
    }

    fn read_stsz(&mut self) -> Result<(), ReadHeadError> {
        FullBox::read_from(&mut self.rdr)?;
        let sample_size = read_u32(&mut self.rdr)?;
        let sample_count = read_u32(&mut self.rdr)?;
        let mut entry_sizes = Vec::new();
        if sample_size == 0 {
            for _ in 0..sample_count {
                entry_sizes.push(read_u32(&mut self.rdr)?);
            }
        }
        self.current_stbl(&TYPE_STSZ)?.stsz = Some(Stsz {
            sample_size,
            sample_count,
            entry_sizes,
        });
        Ok(())
    }

    fn read_stco(&mut self) -> Result<(), ReadHeadError> {
        FullBox::read_from(&mut self.rdr)?;
        let count = read_u32(&mut self.rdr)?;
        let mut offsets = Vec::new();
        for _ in 0..count {
            offsets.push(u64::from(read_u32(&mut self.rdr)?));
        }
        self.current_stbl(&TYPE_STCO)?.chunk_offsets = Some(offsets);
        Ok(())
    }

    fn read_co64(&mut self) -> Result<(), ReadHeadError> {
        FullBox::read_from(&mut self.rdr)?;
        let count = read_u32(&mut self.rdr)?;
        let mut offsets = Vec::new();
        for _ in 0..count {
            offsets.push(read_u64(&mut self.rdr)?);
        }
        self.current_stbl(&TYPE_CO64)?.chunk_offsets = Some(offsets);
        Ok(())
    }

    // Returns the temporally next packet across all tracks, or None once
    // every track is exhausted.
    pub fn read_packet(&mut self) -> Result<Option<Packet>, ReadPacketError> {
        let Some(cursors) = self.cursors.as_mut() else {
            return Err(ReadPacketError::HeadNotRead);
        };

        loop {
            // Pick the track whose next sample decodes first on the movie
            // clock. Ties keep the earliest track in discovery order.
            let mut best: Option<(usize, SampleEntry, u64)> = None;
            for (i, track) in self.tracks.iter().enumerate() {
                let Some(sample) = track.samples.get(cursors[i].next_sample) else {
                    continue;
                };
                let dts = rescale(sample.dts, self.info.timescale, track.timescale);
                let better = match &best {
                    Some((_, _, best_dts)) => dts < *best_dts,
                    None => true,
                };
                if better {
                    best = Some((i, *sample, dts));
                }
            }
            let Some((track_idx, sample, dts)) = best else {
                return Ok(None);
            };

            self.rdr
                .seek(SeekFrom::Start(sample.offset))
                .map_err(ReadPacketError::Seek)?;
            let mut data = vec![0; usize::try_from(sample.size)?];
            self.rdr
                .read_exact(&mut data)
                .map_err(ReadPacketError::Read)?;
            cursors[track_idx].next_sample += 1;

            let track = &self.tracks[track_idx];
            let pts = rescale(sample.pts, self.info.timescale, track.timescale);
            let data = match track.codec {
                CodecId::H264 => {
                    let TrackExtra::H264(config) = &track.extra else {
                        return Err(ReadPacketError::MissingExtraData(track.track_id));
                    };
                    process_h264(data, config, &mut cursors[track_idx].pending_params)
                }
                CodecId::H265 => {
                    let TrackExtra::H265(config) = &track.extra else {
                        return Err(ReadPacketError::MissingExtraData(track.track_id));
                    };
                    process_h265(data, config, &mut cursors[track_idx].pending_params)
                }
                CodecId::Aac => {
                    let TrackExtra::Aac { asc } = &track.extra else {
                        return Err(ReadPacketError::MissingExtraData(track.track_id));
                    };
                    let parsed = codec::AudioSpecificConfig::parse(asc)
                        .map_err(|e| ReadPacketError::Asc(track.track_id, e))?;
                    let header = parsed
                        .adts_header(data.len() + 7)
                        .map_err(|e| ReadPacketError::Adts(track.track_id, e))?;
                    let mut out = Vec::with_capacity(7 + data.len());
                    out.extend_from_slice(&header);
                    out.extend_from_slice(&data);
                    out
                }
                CodecId::G711Alaw | CodecId::G711Ulaw | CodecId::Unknown => data,
            };

            // Parameter set only samples get carried over to the next
            // random access point instead of being emitted.
            if data.is_empty() {
                continue;
            }
            return Ok(Some(Packet {
                codec: track.codec,
                track_id: track.track_id,
                pts,
                dts,
                data,
            }));
        }
    }
}

// Rescales ticks between timescales with truncating division.
fn rescale(v: u64, to: u32, from: u32) -> u64 {
    let scaled = u128::from(v) * u128::from(to) / u128::from(from);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

// Extracts the AudioSpecificConfig from an esds payload. The payload
// starts with the FullBox prefix, followed by a chain of MPEG-4
// descriptors with base-128 expandable sizes.
fn parse_esds(payload: &[u8]) -> Result<Vec<u8>, EsdsError> {
    const TAG_ES: u8 = 0x03;
    const TAG_DECODER_CONFIG: u8 = 0x04;
    const TAG_DECODER_SPECIFIC_INFO: u8 = 0x05;

    let mut pos = 4; // FullBox.
    while pos < payload.len() {
        let tag = payload[pos];
        pos += 1;

        // Expandable size: seven bits per byte, up to four bytes.
        let mut size: usize = 0;
        for _ in 0..4 {
            let b = *payload.get(pos).ok_or(EsdsError::DescriptorSize)?;
            pos += 1;
            size = size << 7 | usize::from(b & 0b0111_1111);
            if b & 0b1000_0000 == 0 {
                break;
            }
        }

        match tag {
            TAG_ES => {
                // ES_ID and stream dependence flags, then nested
                // descriptors. The optional fields are flag gated.
                let flags = *payload.get(pos + 2).ok_or(EsdsError::DescriptorSize)?;
                pos += 3;
                if flags & 0b1000_0000 != 0 {
                    pos += 2; // dependsOn_ES_ID.
                }
                if flags & 0b0100_0000 != 0 {
                    let url_len = *payload.get(pos).ok_or(EsdsError::DescriptorSize)?;
                    pos += 1 + usize::from(url_len);
                }
                if flags & 0b0010_0000 != 0 {
                    pos += 2; // OCR ES id.
                }
            }
            TAG_DECODER_CONFIG => {
                // Object type, stream type, buffer size and bitrates,
                // then nested descriptors.
                pos += 13;
            }
            TAG_DECODER_SPECIFIC_INFO => {
                let asc = payload
                    .get(pos..pos.checked_add(size).ok_or(EsdsError::DescriptorSize)?)
                    .ok_or(EsdsError::DescriptorSize)?;
                return Ok(asc.to_vec());
            }
            _ => {
                pos = pos.checked_add(size).ok_or(EsdsError::DescriptorSize)?;
            }
        }
    }
    Err(EsdsError::MissingSpecificInfo)
}

// Rewrites one AVCC sample to Annex-B and applies the parameter set
// policy: parameter set only samples are buffered and prepended to the
// next random access sample, IDRs with no buffered sets get the avcC
// sets instead. An empty return means the sample was consumed.
fn process_h264(
    mut sample: Vec<u8>,
    config: &codec::AvcDecoderConfig,
    pending: &mut Vec<u8>,
) -> Vec<u8> {
    let mut vcl = false;
    let mut idr = false;
    let mut params = false;

    let mut pos: usize = 0;
    while pos.saturating_add(4) <= sample.len() {
        let nalu_size = u32::from_be_bytes([
            sample[pos],
            sample[pos + 1],
            sample[pos + 2],
            sample[pos + 3],
        ]);
        codec::avcc_to_annexb(&mut sample[pos..]);
        let Some(&header) = sample.get(pos + 4) else {
            break;
        };
        let nalu_type = codec::h264_nalu_type(header);
        if codec::h264_is_parameter_set(nalu_type) {
            params = true;
        }
        if codec::h264_is_idr(nalu_type) {
            idr = true;
        }
        if codec::h264_is_vcl(nalu_type) {
            vcl = true;
        }
        let Some(next) = usize::try_from(nalu_size)
            .ok()
            .and_then(|n| pos.checked_add(4)?.checked_add(n))
        else {
            break;
        };
        pos = next;
    }

    if !vcl {
        if params {
            pending.extend_from_slice(&sample);
            return Vec::new();
        }
        return sample;
    }
    if params {
        // The sample carries its own parameter sets.
        pending.clear();
        return sample;
    }
    if !idr {
        return sample;
    }
    if pending.is_empty() {
        let mut out = config.parameter_sets_annexb();
        out.extend_from_slice(&sample);
        return out;
    }
    let mut out = std::mem::take(pending);
    out.extend_from_slice(&sample);
    out
}

// H.265 variant of the same policy, with VPS counting as a parameter
// set and any IRAP picture as a random access point.
fn process_h265(
    mut sample: Vec<u8>,
    config: &codec::HevcDecoderConfig,
    pending: &mut Vec<u8>,
) -> Vec<u8> {
    let mut vcl = false;
    let mut irap = false;
    let mut params = false;

    let mut pos: usize = 0;
    while pos.saturating_add(4) <= sample.len() {
        let nalu_size = u32::from_be_bytes([
            sample[pos],
            sample[pos + 1],
            sample[pos + 2],
            sample[pos + 3],
        ]);
        codec::avcc_to_annexb(&mut sample[pos..]);
        let Some(&header) = sample.get(pos + 4) else {
            break;
        };
        let nalu_type = codec::h265_nalu_type(header);
        if codec::h265_is_parameter_set(nalu_type) {
            params = true;
        }
        if codec::h265_is_irap(nalu_type) {
            irap = true;
        }
        if codec::h265_is_vcl(nalu_type) {
            vcl = true;
        }
        let Some(next) = usize::try_from(nalu_size)
            .ok()
            .and_then(|n| pos.checked_add(4)?.checked_add(n))
        else {
            break;
        };
        pos = next;
    }

    if !vcl {
        if params {
            pending.extend_from_slice(&sample);
            return Vec::new();
        }
        return sample;
    }
    if params {
        pending.clear();
        return sample;
    }
    if !irap {
        return sample;
    }
    if pending.is_empty() {
        let mut out = config.parameter_sets_annexb();
        out.extend_from_slice(&sample);
        return out;
    }
    let mut out = std::mem::take(pending);
    out.extend_from_slice(&sample);
    out
}
