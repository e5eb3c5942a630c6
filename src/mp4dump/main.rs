// SPDX-License-Identifier: GPL-2.0-or-later

use clap::Parser;
use mp4::{CodecId, Mp4Demuxer, ReadHeadError, ReadPacketError};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(version, about = "Dump track and packet information from an mp4 file")]
struct Args {
    // Print one line per packet.
    #[arg(long)]
    packets: bool,

    // Write each track's elementary stream into this directory.
    #[arg(long)]
    extract: Option<PathBuf>,

    // Stop after this many packets.
    #[arg(long)]
    limit: Option<u64>,

    path: PathBuf,
}

#[derive(Debug, Error)]
enum DumpError {
    #[error("open: {0}")]
    Open(std::io::Error),

    #[error("read head: {0}")]
    ReadHead(#[from] ReadHeadError),

    #[error("read packet: {0}")]
    ReadPacket(#[from] ReadPacketError),

    #[error("create '{0}': {1}")]
    Create(String, std::io::Error),

    #[error("write: {0}")]
    Write(std::io::Error),
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<(), DumpError> {
    let file = File::open(&args.path).map_err(DumpError::Open)?;
    let mut demuxer = Mp4Demuxer::new(file);
    let tracks = demuxer.read_head()?;

    let info = demuxer.file_info();
    println!(
        "brand: {} timescale: {} duration: {} mdat boxes: {}",
        String::from_utf8_lossy(&info.major_brand),
        info.timescale,
        info.duration,
        demuxer.mdat_offsets().len(),
    );
    for track in &tracks {
        if track.codec.is_video() {
            println!(
                "track {}: {:?} {}x{} handler: {} timescale: {} duration: {}",
                track.track_id,
                track.codec,
                track.width,
                track.height,
                String::from_utf8_lossy(&track.handler_type),
                track.timescale,
                track.duration,
            );
        } else {
            println!(
                "track {}: {:?} {} Hz {} bit {} ch handler: {} timescale: {} duration: {}",
                track.track_id,
                track.codec,
                track.sample_rate,
                track.sample_bits,
                track.channel_count,
                String::from_utf8_lossy(&track.handler_type),
                track.timescale,
                track.duration,
            );
        }
    }

    if !args.packets && args.extract.is_none() {
        return Ok(());
    }

    let mut outputs: HashMap<u32, BufWriter<File>> = HashMap::new();
    if let Some(dir) = &args.extract {
        for track in &tracks {
            let path = dir.join(format!("track_{}.{}", track.track_id, extension(track.codec)));
            let file = File::create(&path)
                .map_err(|e| DumpError::Create(path.to_string_lossy().into_owned(), e))?;
            outputs.insert(track.track_id, BufWriter::new(file));
        }
    }

    let mut count: u64 = 0;
    while let Some(packet) = demuxer.read_packet()? {
        if args.packets {
            println!(
                "track {} {:?} pts: {} dts: {} size: {}",
                packet.track_id,
                packet.codec,
                packet.pts,
                packet.dts,
                packet.data.len(),
            );
        }
        if let Some(out) = outputs.get_mut(&packet.track_id) {
            out.write_all(&packet.data).map_err(DumpError::Write)?;
        }
        count += 1;
        if args.limit.is_some_and(|limit| count >= limit) {
            break;
        }
    }
    for out in outputs.values_mut() {
        out.flush().map_err(DumpError::Write)?;
    }
    println!("{count} packets");
    Ok(())
}

fn extension(codec: CodecId) -> &'static str {
    match codec {
        CodecId::H264 => "h264",
        CodecId::H265 => "h265",
        CodecId::Aac => "aac",
        CodecId::G711Alaw => "al",
        CodecId::G711Ulaw => "ul",
        CodecId::Unknown => "bin",
    }
}
