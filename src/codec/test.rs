#![allow(clippy::unwrap_used)]

use crate::*;
use pretty_assertions::assert_eq;
use test_case::test_case;

#[test]
fn test_avcc_to_annexb() {
    let mut buf = [0x00, 0x00, 0x00, 0x05, 0x65, 0x88, 0x84];
    avcc_to_annexb(&mut buf);
    assert_eq!([0, 0, 0, 1, 0x65, 0x88, 0x84], buf);

    // Too short to hold a prefix.
    let mut short = [0xab, 0xcd];
    avcc_to_annexb(&mut short);
    assert_eq!([0xab, 0xcd], short);
}

#[test_case(0x65, H264_NALU_IDR)]
#[test_case(0x41, H264_NALU_NON_IDR)]
#[test_case(0x67, H264_NALU_SPS)]
#[test_case(0x68, H264_NALU_PPS)]
#[test_case(0x06, H264_NALU_SEI)]
fn test_h264_nalu_type(header: u8, want: u8) {
    assert_eq!(want, h264_nalu_type(header));
}

#[test]
fn test_h264_predicates() {
    assert!(h264_is_vcl(H264_NALU_NON_IDR));
    assert!(h264_is_vcl(H264_NALU_IDR));
    assert!(!h264_is_vcl(H264_NALU_SEI));
    assert!(!h264_is_vcl(H264_NALU_SPS));

    assert!(h264_is_idr(H264_NALU_IDR));
    assert!(!h264_is_idr(H264_NALU_NON_IDR));

    assert!(h264_is_parameter_set(H264_NALU_SPS));
    assert!(h264_is_parameter_set(H264_NALU_PPS));
    assert!(!h264_is_parameter_set(H264_NALU_SEI));
}

#[test_case(0x02, 1)] // TRAIL_R.
#[test_case(0x26, 19)] // IDR_W_RADL.
#[test_case(0x40, H265_NALU_VPS)]
#[test_case(0x42, H265_NALU_SPS)]
#[test_case(0x44, H265_NALU_PPS)]
fn test_h265_nalu_type(header: u8, want: u8) {
    assert_eq!(want, h265_nalu_type(header));
}

#[test]
fn test_h265_predicates() {
    // Trailing and leading picture range.
    assert!(h265_is_vcl(H265_NALU_TRAIL_N));
    assert!(h265_is_vcl(H265_NALU_RASL_R));
    // IRAP range is both VCL and a random access point.
    assert!(h265_is_vcl(19));
    assert!(h265_is_irap(19));
    assert!(h265_is_irap(H265_NALU_CRA));
    assert!(!h265_is_irap(1));
    // Reserved sub-layer range in between is neither.
    assert!(!h265_is_vcl(10));

    assert!(h265_is_parameter_set(H265_NALU_VPS));
    assert!(h265_is_parameter_set(H265_NALU_SPS));
    assert!(h265_is_parameter_set(H265_NALU_PPS));
    assert!(!h265_is_parameter_set(H265_NALU_CRA));
}

#[test]
fn test_parse_avc_config() {
    let record = [
        1,    // Configuration version.
        0x64, // Profile.
        0x00, // Profile compatibility.
        0x28, // Level.
        0xff, // Reserved, lengthSizeMinusOne.
        0xe1, // Reserved, numOfSequenceParameterSets.
        0x00, 0x04, // SPS length.
        0x67, 0x64, 0x00, 0x28, // SPS.
        0x01, // numOfPictureParameterSets.
        0x00, 0x02, // PPS length.
        0x68, 0xee, // PPS.
    ];

    let got = AvcDecoderConfig::parse(&record).unwrap();
    let want = AvcDecoderConfig {
        profile: 0x64,
        profile_compatibility: 0,
        level: 0x28,
        nalu_length_size: 4,
        sps: vec![vec![0x67, 0x64, 0x00, 0x28]],
        pps: vec![vec![0x68, 0xee]],
    };
    assert_eq!(want, got);

    assert_eq!(
        vec![
            0, 0, 0, 1, 0x67, 0x64, 0x00, 0x28, // SPS.
            0, 0, 0, 1, 0x68, 0xee, // PPS.
        ],
        got.parameter_sets_annexb()
    );
}

#[test]
fn test_parse_avc_config_bad_version() {
    assert!(matches!(
        AvcDecoderConfig::parse(&[2, 0, 0, 0, 0xff, 0xe0, 0]),
        Err(ParseAvcConfigError::Version(2))
    ));
}

#[test]
fn test_parse_avc_config_truncated() {
    let record = [1, 0x64, 0x00, 0x28, 0xff, 0xe1, 0x00, 0xff, 0x67];
    assert!(matches!(
        AvcDecoderConfig::parse(&record),
        Err(ParseAvcConfigError::UnexpectedEnd)
    ));
}

#[test]
fn test_parse_hevc_config() {
    let mut record = vec![1]; // Configuration version.
    record.extend_from_slice(&[0; 20]); // General profile and level fields.
    record.push(0xff); // Reserved, lengthSizeMinusOne.
    record.push(3); // numOfArrays.
    for (nalu_type, payload) in [
        (0xa0, [0x40, 0x01]), // VPS array.
        (0xa1, [0x42, 0x01]), // SPS array.
        (0xa2, [0x44, 0x01]), // PPS array.
    ] {
        record.push(nalu_type);
        record.extend_from_slice(&[0x00, 0x01]); // numNalus.
        record.extend_from_slice(&[0x00, 0x02]); // NAL length.
        record.extend_from_slice(&payload);
    }

    let got = HevcDecoderConfig::parse(&record).unwrap();
    assert_eq!(4, got.nalu_length_size);
    assert_eq!(3, got.arrays.len());
    assert_eq!(H265_NALU_VPS, got.arrays[0].nalu_type);
    assert_eq!(H265_NALU_SPS, got.arrays[1].nalu_type);
    assert_eq!(H265_NALU_PPS, got.arrays[2].nalu_type);

    assert_eq!(
        vec![
            0, 0, 0, 1, 0x40, 0x01, // VPS.
            0, 0, 0, 1, 0x42, 0x01, // SPS.
            0, 0, 0, 1, 0x44, 0x01, // PPS.
        ],
        got.parameter_sets_annexb()
    );
}

#[test]
fn test_parse_hevc_config_truncated() {
    assert!(matches!(
        HevcDecoderConfig::parse(&[1, 0, 0, 0]),
        Err(ParseHevcConfigError::UnexpectedEnd)
    ));
}

// AAC-LC, 44100 Hz, stereo.
#[test]
fn test_parse_asc() {
    let got = AudioSpecificConfig::parse(&[0x12, 0x10]).unwrap();
    let want = AudioSpecificConfig {
        object_type: 2,
        frequency_index: 4,
        sample_rate: 44100,
        channel_config: 2,
    };
    assert_eq!(want, got);
}

// AAC-LC, 48000 Hz, mono.
#[test]
fn test_parse_asc2() {
    let got = AudioSpecificConfig::parse(&[0x11, 0x88]).unwrap();
    let want = AudioSpecificConfig {
        object_type: 2,
        frequency_index: 3,
        sample_rate: 48000,
        channel_config: 1,
    };
    assert_eq!(want, got);
}

#[test]
fn test_parse_asc_errors() {
    assert!(matches!(
        AudioSpecificConfig::parse(&[0x12]),
        Err(ParseAscError::TooShort)
    ));
    // Escaped object type 31.
    assert!(matches!(
        AudioSpecificConfig::parse(&[0xf8, 0x10]),
        Err(ParseAscError::ObjectType(31))
    ));
    // Explicit 24-bit frequency.
    assert!(matches!(
        AudioSpecificConfig::parse(&[0x17, 0x90]),
        Err(ParseAscError::FrequencyIndex(15))
    ));
    // Channel configuration zero.
    assert!(matches!(
        AudioSpecificConfig::parse(&[0x12, 0x00]),
        Err(ParseAscError::ChannelConfig(0))
    ));
}

#[test]
fn test_adts_header() {
    let asc = AudioSpecificConfig::parse(&[0x12, 0x10]).unwrap();
    let got = asc.adts_header(207).unwrap();
    let want = [
        0xff, 0xf1, // Syncword, MPEG-4, no CRC.
        0x50, // Profile 1 (LC), frequency index 4.
        0x80, // Channel config 2, frame length high bits.
        0x19, // Frame length middle bits: 207 >> 3.
        0xff, // Frame length low bits, buffer fullness.
        0xfc, // Buffer fullness, one frame.
    ];
    assert_eq!(want, got);

    // The 13-bit length field must round-trip.
    let len =
        usize::from(got[3] & 0b11) << 11 | usize::from(got[4]) << 3 | usize::from(got[5] >> 5);
    assert_eq!(207, len);
}

#[test]
fn test_adts_header_too_large() {
    let asc = AudioSpecificConfig::parse(&[0x12, 0x10]).unwrap();
    assert!(matches!(
        asc.adts_header(1 << 13),
        Err(AdtsHeaderError::FrameTooLarge(_))
    ));
}
