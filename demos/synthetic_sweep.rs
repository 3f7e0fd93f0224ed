//! Example: Sweep a synthetic source around a circular array
//!
//! Usage:
//!   cargo run --release --example synthetic_sweep -- [--mics N] [--radius M] [--grid G] [--json]
//!
//! For every grid direction a broadband plane wave is rendered, fed through
//! the tracker block by block, and the final estimate compared to the truth.

use serde::Serialize;
use srp_doa::{DoaEstimate, DoaTracker, LocalizerConfig, MicArray};
use std::env;
use std::f64::consts::PI;

#[derive(Serialize)]
struct SweepPoint {
    true_index: usize,
    true_azimuth_deg: f32,
    error_deg: f32,
    estimate: DoaEstimate,
}

/// Interleaved broadband plane wave arriving from azimuth `azimuth` (radians)
fn render(mics: &MicArray, azimuth: f64, config: &LocalizerConfig, blocks: usize) -> Vec<f32> {
    let fs = config.sample_rate as f64;
    let c = config.sound_speed as f64;
    let (dy, dx) = azimuth.sin_cos();
    let bins = config.k_min..config.k_min + config.k_len;
    let count = bins.len() as f64;

    let n_samples = blocks * config.fft_size;
    let mut out = Vec::with_capacity(n_samples * mics.len());
    for t in 0..n_samples {
        for p in mics.positions() {
            let time = t as f64 / fs + (p[0] as f64 * dx + p[1] as f64 * dy) / c;
            let sample: f64 = bins
                .clone()
                .map(|k| {
                    let f = k as f64 / config.fft_size as f64 * fs;
                    (2.0 * PI * f * time + PI * (k * k) as f64 / count).cos()
                })
                .sum();
            out.push((sample / count) as f32);
        }
    }
    out
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut n_mics = 4usize;
    let mut radius = 0.02f32;
    let mut config = LocalizerConfig {
        k_min: 4,
        k_len: 16,
        grid_size: 36,
        ..Default::default()
    };
    let mut json = false;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--mics" | "--radius" | "--grid" => {
                let v = args.first().ok_or(format!("{} requires a value", a))?.clone();
                args.remove(0);
                match a.as_str() {
                    "--mics" => n_mics = v.parse()?,
                    "--radius" => radius = v.parse()?,
                    _ => config.grid_size = v.parse()?,
                }
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: synthetic_sweep [--mics N] [--radius M] [--grid G] [--json]\n\
                     \n\
                     --mics N     Microphones on the circle (default: 4)\n\
                     --radius M   Circle radius in metres (default: 0.02)\n\
                     --grid G     Planar grid size (default: 36)\n\
                     --json       Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            other => return Err(format!("Unknown argument: {}", other).into()),
        }
    }

    let mics = MicArray::circular(n_mics, radius)?;
    let mut tracker = DoaTracker::new(config.clone(), &mics)?;
    let blocks = config.n_frames + 2;

    let mut worst = 0.0f32;
    for true_index in 0..tracker.grid().len() {
        let truth = *tracker.grid().direction(true_index);
        let signal = render(&mics, truth.azimuth as f64, &config, blocks);

        tracker.reset();
        let mut estimate = None;
        for block in signal.chunks(tracker.block_len()) {
            estimate = Some(tracker.process_block(block)?);
        }
        let estimate = estimate.ok_or("no blocks processed")?;

        let found = tracker.grid().direction(estimate.index);
        let error_deg = found.angle_to(&truth).to_degrees();
        worst = worst.max(error_deg);

        let point = SweepPoint {
            true_index,
            true_azimuth_deg: truth.azimuth.to_degrees(),
            error_deg,
            estimate,
        };
        if json {
            println!("{}", serde_json::to_string(&point)?);
        } else {
            println!(
                "true {:7.1}°  estimated {:7.1}°  error {:5.1}°  power {:.1}",
                point.true_azimuth_deg,
                estimate.azimuth_degrees(),
                error_deg,
                estimate.power
            );
        }
    }

    eprintln!("Worst error over {} directions: {:.1}°", tracker.grid().len(), worst);
    Ok(())
}
