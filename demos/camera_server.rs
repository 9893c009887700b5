//! Streams a synthetic camera: a bright square sweeping across a dark frame.
//!
//! ```text
//! cargo run --example camera_server [bind-addr]
//! ```
//!
//! Clients asking for codec `none` get raw frames; any other codec name is
//! served by the passthrough codec.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use camtrack::camera::FrameSource;
use camtrack::codec::Passthrough;
use camtrack::server::{CameraServer, ServerConfig};
use camtrack::shared_queue::Shutdown;
use camtrack::{CameraSettings, Frame};

const SQUARE: u32 = 40;

struct MovingSquare {
    dims: (u32, u32),
    interval: Duration,
    next: Instant,
    tick: u32,
}

impl MovingSquare {
    fn new() -> Self {
        Self {
            dims: (640, 480),
            interval: Duration::from_millis(50),
            next: Instant::now(),
            tick: 0,
        }
    }
}

impl FrameSource for MovingSquare {
    fn configure(&mut self, settings: &CameraSettings) -> camtrack::Result<()> {
        if settings.width <= SQUARE || settings.height < SQUARE || settings.fps == 0 {
            return Err(camtrack::Error::camera(format!(
                "cannot capture {}x{} @ {} fps",
                settings.width, settings.height, settings.fps
            )));
        }

        self.dims = (settings.width, settings.height);
        self.interval = Duration::from_secs(1) / settings.fps;
        self.next = Instant::now();
        self.tick = 0;

        log::info!(
            "camera set to {}x{} @ {} fps (bit rate hint {})",
            settings.width,
            settings.height,
            settings.fps,
            settings.bit_rate()
        );

        Ok(())
    }

    fn read(&mut self) -> camtrack::Result<Frame> {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
        }
        self.next += self.interval;

        let (w, h) = self.dims;
        let mut frame = Frame::new(w, h);

        let span = w - SQUARE;
        let x0 = (self.tick * 4) % span;
        let y0 = (h - SQUARE) / 2;
        for y in y0..y0 + SQUARE {
            for x in x0..x0 + SQUARE {
                frame.set_pixel(x, y, [255, 255, 255]);
            }
        }

        self.tick = self.tick.wrapping_add(1);

        Ok(frame)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let bind_addr: SocketAddr = match std::env::args().nth(1) {
        Some(addr) => addr.parse().context("invalid bind address")?,
        None => ServerConfig::default().bind_addr,
    };

    let config = ServerConfig::default().bind(bind_addr);
    let server = CameraServer::new(config, Box::new(MovingSquare::new()), Arc::new(Passthrough));

    let mut bound = server.bind().context("failed to start camera server")?;
    bound.run(&Shutdown::new())?;

    Ok(())
}
