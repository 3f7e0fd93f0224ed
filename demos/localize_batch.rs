//! Example: Localize the dominant source in multichannel recordings
//!
//! Usage:
//!   cargo run --release --example localize_batch -- --geometry array.txt [--config cfg.json] [--jobs N] [--json] <file1> <file2> ...
//!
//! Notes:
//! - The channel count of each file must match the geometry file.
//! - Files are processed in parallel; each file runs its own tracker.
//! - The reported direction is the most frequent per-block estimate once the
//!   trailing window is full.

use rayon::prelude::*;
use srp_doa::{parse_geometry, DoaTracker, LocalizerConfig, MicArray};
use std::env;
use std::fs::File;
use std::time::Instant;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;

/// Decode a file to interleaved f32 samples, returning (samples, channels, sample_rate)
fn decode_interleaved(path: &str) -> Result<(Vec<f32>, usize, u32), Box<dyn std::error::Error>> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or("No supported audio tracks found")?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.ok_or("Unknown sample rate")?;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut channels = 0;
    let mut samples: Vec<f32> = Vec::new();

    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(symphonia::core::errors::Error::DecodeError(_)) => {
                // Skip corrupted packets
                continue;
            }
            Err(e) => return Err(Box::new(e)),
        }
    }

    Ok((samples, channels, sample_rate))
}

struct FileResult {
    path: String,
    blocks: usize,
    index: usize,
    azimuth_deg: f32,
    elevation_deg: f32,
    votes: usize,
    processing_ms: f32,
}

fn localize_file(
    path: &str,
    mics: &MicArray,
    config: &LocalizerConfig,
) -> Result<FileResult, Box<dyn std::error::Error>> {
    let t0 = Instant::now();
    let (samples, channels, sample_rate) = decode_interleaved(path)?;

    if channels != mics.len() {
        return Err(format!(
            "{} channels in file, {} microphones in geometry",
            channels,
            mics.len()
        )
        .into());
    }

    let config = LocalizerConfig {
        sample_rate: sample_rate as f32,
        ..config.clone()
    };
    let mut tracker = DoaTracker::new(config, mics)?;
    let mut votes = vec![0usize; tracker.grid().len()];

    let block_len = tracker.block_len();
    let mut blocks = 0;
    for block in samples.chunks_exact(block_len) {
        let estimate = tracker.process_block(block)?;
        blocks += 1;
        if estimate.primed && estimate.power > 0.0 {
            votes[estimate.index] += 1;
        }
    }

    // First maximum, like the per-block scan
    let mut index = 0;
    for (i, &v) in votes.iter().enumerate() {
        if v > votes[index] {
            index = i;
        }
    }
    let direction = tracker.grid().direction(index);

    Ok(FileResult {
        path: path.to_string(),
        blocks,
        index,
        azimuth_deg: direction.azimuth.to_degrees(),
        elevation_deg: direction.elevation.to_degrees(),
        votes: votes[index],
        processing_ms: t0.elapsed().as_secs_f32() * 1000.0,
    })
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut geometry: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--geometry" => {
                geometry = Some(args.first().ok_or("--geometry requires a path")?.clone());
                args.remove(0);
            }
            "--config" => {
                config_path = Some(args.first().ok_or("--config requires a path")?.clone());
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: localize_batch --geometry FILE [--config FILE] [--jobs N] [--json] <file1> <file2> ...\n\
                     \n\
                     --geometry FILE  Microphone positions (`id x y z` per line after a header)\n\
                     --config FILE    LocalizerConfig as JSON; missing fields use defaults\n\
                     --jobs N         Parallel workers (default: CPU-1)\n\
                     --json           Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    let geometry = geometry.ok_or("--geometry is required. Use --help for usage.")?;
    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let config: LocalizerConfig = match config_path {
        Some(p) => serde_json::from_str(&std::fs::read_to_string(p)?)?,
        None => LocalizerConfig::default(),
    };

    // The channel count is taken from the number of geometry lines
    let geometry_text = std::fs::read_to_string(&geometry)?;
    let channels = geometry_text
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty() && !l.trim().starts_with('#'))
        .count();
    let mics = parse_geometry(&geometry_text, channels)?;

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, {} microphones, jobs={}", paths.len(), mics.len(), jobs);

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<(String, Result<FileResult, String>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let r = localize_file(path, &mics, &config).map_err(|e| e.to_string());
                (path.clone(), r)
            })
            .collect()
    });

    for (path, out) in &outs {
        match (out, json) {
            (Ok(r), true) => println!(
                "{{\"file\":{},\"index\":{},\"azimuth_deg\":{:.2},\"elevation_deg\":{:.2},\"votes\":{},\"blocks\":{},\"processing_time_ms\":{:.2}}}",
                serde_json::to_string(&r.path)?,
                r.index,
                r.azimuth_deg,
                r.elevation_deg,
                r.votes,
                r.blocks,
                r.processing_ms
            ),
            (Ok(r), false) => println!(
                "{}: azimuth {:.1}°, elevation {:.1}° ({} of {} blocks, {:.1} ms)",
                r.path, r.azimuth_deg, r.elevation_deg, r.votes, r.blocks, r.processing_ms
            ),
            (Err(e), true) => println!(
                "{{\"file\":{},\"error\":{}}}",
                serde_json::to_string(path)?,
                serde_json::to_string(e)?
            ),
            (Err(e), false) => println!("{}: ERROR {}", path, e),
        }
    }

    let failed = outs.iter().filter(|(_, r)| r.is_err()).count();
    eprintln!(
        "Done: {} ok, {} failed, {:.2}s total",
        outs.len() - failed,
        failed,
        t0.elapsed().as_secs_f32()
    );
    Ok(())
}
