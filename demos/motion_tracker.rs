//! Connects to a camera server and logs the tracks of bright moving blobs.
//!
//! ```text
//! RUST_LOG=info cargo run --example motion_tracker [ip] [port] [codec]
//! ```

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use camtrack::client::StreamClient;
use camtrack::codec::Passthrough;
use camtrack::pipeline::Pipeline;
use camtrack::vision::{Detections, VisionService};
use camtrack::{Detection, Frame, Mask, QueueConfig, StreamConfig, TrackerConfig};

/// Foreground is any pixel brighter than the threshold; blobs are its
/// 4-connected components.
struct Threshold {
    level: u8,
    min_area: usize,
}

impl VisionService for Threshold {
    fn detect(&mut self, frame: &Frame) -> Detections {
        let (w, h) = frame.dims();
        let mut mask = Mask::new(w, h);

        for y in 0..h {
            for x in 0..w {
                if let Some(px) = frame.pixel(x, y) {
                    if px.iter().any(|c| *c > self.level) {
                        mask.set(x, y, true);
                    }
                }
            }
        }

        let mut seen = vec![false; (w * h) as usize];
        let mut centroids = Vec::new();
        let mut stack = Vec::new();

        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) as usize;
                if seen[idx] || !mask.is_foreground(x, y) {
                    continue;
                }

                seen[idx] = true;
                stack.push((x, y));

                let (mut sx, mut sy, mut area) = (0u64, 0u64, 0usize);
                while let Some((cx, cy)) = stack.pop() {
                    sx += cx as u64;
                    sy += cy as u64;
                    area += 1;

                    let around = [
                        (cx.wrapping_sub(1), cy),
                        (cx + 1, cy),
                        (cx, cy.wrapping_sub(1)),
                        (cx, cy + 1),
                    ];
                    for (nx, ny) in around {
                        if nx >= w || ny >= h {
                            continue;
                        }
                        let n = (ny * w + nx) as usize;
                        if !seen[n] && mask.is_foreground(nx, ny) {
                            seen[n] = true;
                            stack.push((nx, ny));
                        }
                    }
                }

                if area >= self.min_area {
                    let cx = sx as f32 / area as f32;
                    let cy = sy as f32 / area as f32;
                    let diameter = (area as f32).sqrt();
                    centroids.push(Detection::new(cx, cy).with_size(diameter));
                }
            }
        }

        Detections { mask, centroids }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let mut config = StreamConfig::default();
    if let Some(ip) = args.next() {
        let port = match args.next() {
            Some(port) => port.parse().context("invalid port")?,
            None => config.port,
        };
        config = config.peer(ip, port);
    }
    if let Some(codec) = args.next() {
        config = config.codec(codec);
    }

    let client = StreamClient::connect(&config, &Passthrough)
        .with_context(|| format!("cannot stream from {}", config.peer_addr()))?;

    let vision = Threshold {
        level: 128,
        min_area: 16,
    };

    let mut pipeline = Pipeline::start(
        client,
        vision,
        TrackerConfig::default(),
        QueueConfig::default(),
        config.flip,
    );

    while pipeline.is_running() {
        match pipeline.try_recv() {
            Some(processed) => {
                for track in processed.tracks.iter() {
                    log::info!(
                        "track {} at ({:.0}, {:.0}) age {} visible {}",
                        track.id,
                        track.x,
                        track.y,
                        track.age,
                        track.total_visible_count
                    );
                }
            }
            None => thread::sleep(Duration::from_millis(5)),
        }
    }

    pipeline.stop()?;

    Ok(())
}
