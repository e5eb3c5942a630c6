#![allow(clippy::module_name_repetitions)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadHeadError {
    #[error("read: {0}")]
    Read(#[from] std::io::Error),

    #[error("box '{0}' size {1} is smaller than its own header")]
    BoxSize(String, u64),

    #[error("'{0}' box outside of a track")]
    BoxOutsideTrack(String),

    #[error("'{0}' box outside of a sample table")]
    BoxOutsideStbl(String),

    #[error("moov box extends {0} bytes past the end of the file")]
    Incomplete(u64),

    #[error("movie timescale is zero")]
    MovieTimescale,

    #[error("track {0}: timescale is zero")]
    TrackTimescale(u32),

    #[error("track {0}: {1}")]
    SampleTables(u32, BuildSampleListError),

    #[error("avcC: {0}")]
    AvcConfig(#[from] codec::ParseAvcConfigError),

    #[error("hvcC: {0}")]
    HevcConfig(#[from] codec::ParseHevcConfigError),

    #[error("esds: {0}")]
    Esds(#[from] EsdsError),
}

#[derive(Debug, Error)]
pub enum EsdsError {
    #[error("descriptor extends past the end of the box")]
    DescriptorSize,

    #[error("no decoder specific info descriptor")]
    MissingSpecificInfo,
}

#[derive(Debug, Error)]
pub enum BuildSampleListError {
    #[error("{0}")]
    TryFromInt(#[from] std::num::TryFromIntError),

    #[error("missing required '{0}' table")]
    MissingTable(&'static str),
}

#[derive(Debug, Error)]
pub enum ReadPacketError {
    #[error("read head must succeed before reading packets")]
    HeadNotRead,

    #[error("{0}")]
    TryFromInt(#[from] std::num::TryFromIntError),

    #[error("seek: {0}")]
    Seek(std::io::Error),

    #[error("read: {0}")]
    Read(std::io::Error),

    #[error("track {0}: missing codec extra data")]
    MissingExtraData(u32),

    #[error("track {0}: asc: {1}")]
    Asc(u32, codec::ParseAscError),

    #[error("track {0}: adts: {1}")]
    Adts(u32, codec::AdtsHeaderError),
}
