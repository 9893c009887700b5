//! Sending side of the camera stream.
//!
//! One client at a time. The server waits for a connection, reads the
//! camera settings the client asked for, reconfigures the camera and streams
//! until the client goes away, then listens again.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::camera::FrameSource;
use crate::codec::{CodecFactory, Encodes};
use crate::config::{QueueConfig, DEFAULT_PORT};
use crate::error::{Error, Result};
use crate::frame::{Frame, Packet};
use crate::settings::CameraSettings;
use crate::shared_queue::{SharedQueue, Shutdown};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Sleep between two accept probes while no client is waiting.
    pub accept_poll_interval: Duration,
    /// The settings record must arrive within this time after accept.
    pub handshake_timeout: Duration,
    /// Sizing of the frame and packet queues in compressed mode.
    pub queue: QueueConfig,
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            accept_poll_interval: Duration::from_millis(10),
            handshake_timeout: Duration::from_secs(5),
            queue: QueueConfig::default(),
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn accept_poll_interval(mut self, interval: Duration) -> Self {
        self.accept_poll_interval = interval;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

pub struct CameraServer {
    config: ServerConfig,
    camera: Box<dyn FrameSource>,
    codecs: Arc<dyn CodecFactory>,
}

impl CameraServer {
    pub fn new(
        config: ServerConfig,
        camera: Box<dyn FrameSource>,
        codecs: Arc<dyn CodecFactory>,
    ) -> Self {
        Self {
            config,
            camera,
            codecs,
        }
    }

    pub fn bind(self) -> Result<BoundServer> {
        let listener = TcpListener::bind(self.config.bind_addr).map_err(|err| {
            log::error!("unable to bind {}: {}", self.config.bind_addr, err);
            Error::Io(err)
        })?;

        // accept is polled so the shutdown flag gets a chance between probes
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        log::info!("camera server listening on {}", local_addr);

        Ok(BoundServer {
            listener,
            local_addr,
            config: self.config,
            camera: self.camera,
            codecs: self.codecs,
            sessions: AtomicU64::new(0),
        })
    }
}

pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
    camera: Box<dyn FrameSource>,
    codecs: Arc<dyn CodecFactory>,
    sessions: AtomicU64,
}

impl BoundServer {
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sessions that ran to completion, successfully or not.
    #[inline]
    pub fn sessions_served(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }

    /// Serves clients one after another until `shutdown` is triggered.
    ///
    /// Connection problems end the session only. Camera and codec failures
    /// are returned.
    pub fn run(&mut self, shutdown: &Shutdown) -> Result<()> {
        while !shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    log::info!("client connected from {}", peer);

                    let result = self.serve(stream, peer, shutdown);
                    self.sessions.fetch_add(1, Ordering::Relaxed);

                    match result {
                        Ok(()) => log::info!("session with {} finished", peer),
                        Err(err) if err.is_fatal() => {
                            log::error!("session with {} aborted: {}", peer, err);
                            return Err(err);
                        }
                        Err(err) if err.is_peer_closed() => {
                            log::info!("client {} disconnected", peer)
                        }
                        Err(err) => log::warn!("session with {} failed: {}", peer, err),
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.config.accept_poll_interval);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    log::error!("accept on {} failed: {}", self.local_addr, err);
                    thread::sleep(self.config.accept_poll_interval);
                }
            }
        }

        log::info!("camera server on {} stopped", self.local_addr);

        Ok(())
    }

    fn serve(&mut self, mut stream: TcpStream, peer: SocketAddr, shutdown: &Shutdown) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(self.config.tcp_nodelay)?;

        stream.set_read_timeout(Some(self.config.handshake_timeout))?;
        let settings = CameraSettings::read_from(&mut stream)?;
        stream.set_read_timeout(None)?;

        log::info!(
            "client {} asked for {}x{} @ {} fps, codec {}",
            peer,
            settings.width,
            settings.height,
            settings.fps,
            settings.codec
        );

        self.camera.configure(&settings)?;

        if settings.is_compressed() {
            self.stream_compressed(&mut stream, &settings, shutdown)
        } else {
            self.stream_raw(&mut stream, shutdown)
        }
    }

    // One frame per write, no framing: the client knows the size.
    fn stream_raw(&mut self, stream: &mut TcpStream, shutdown: &Shutdown) -> Result<()> {
        while !shutdown.is_triggered() {
            let frame = self.camera.read()?;
            stream.write_all(&frame.as_bytes())?;
        }

        Ok(())
    }

    fn stream_compressed(
        &mut self,
        stream: &mut TcpStream,
        settings: &CameraSettings,
        shutdown: &Shutdown,
    ) -> Result<()> {
        let encoder = self.codecs.encoder(settings)?;

        let frames = Arc::new(SharedQueue::new(self.config.queue));
        let packets = Arc::new(SharedQueue::new(self.config.queue));
        let session = Shutdown::new();

        let handle = spawn_encoder(encoder, frames.clone(), packets.clone(), session.clone());

        let sent = self.send_packets(stream, &frames, &packets, &session, shutdown);

        session.trigger();
        let encoded = match handle.join() {
            Ok(result) => result,
            Err(_) => Err(Error::codec("encoder thread panicked")),
        };

        // a codec failure outranks whatever it did to the send loop
        encoded?;
        sent
    }

    fn send_packets(
        &mut self,
        stream: &mut TcpStream,
        frames: &SharedQueue<Frame>,
        packets: &SharedQueue<Packet>,
        session: &Shutdown,
        shutdown: &Shutdown,
    ) -> Result<()> {
        while !shutdown.is_triggered() && !session.is_triggered() {
            let frame = self.camera.read()?;

            if !frames.push_until(&frame, session) {
                break;
            }

            // nothing ready yet is fine, capture the next frame
            if let Some(packet) = packets.try_pop() {
                stream.write_all(packet.as_bytes())?;
            }
        }

        Ok(())
    }
}

/// Runs `encoder` on its own thread, moving frames to packets until
/// `session` is triggered. An encoder failure raises `session` itself so
/// the send loop stops feeding it.
fn spawn_encoder(
    encoder: Box<dyn Encodes>,
    frames: Arc<SharedQueue<Frame>>,
    packets: Arc<SharedQueue<Packet>>,
    session: Shutdown,
) -> JoinHandle<Result<()>> {
    thread::spawn(move || {
        let result = encode_loop(encoder, &frames, &packets, &session);

        if let Err(err) = &result {
            log::error!("encoder stopped: {}", err);
            session.trigger();
        }

        result
    })
}

fn encode_loop(
    mut encoder: Box<dyn Encodes>,
    frames: &SharedQueue<Frame>,
    packets: &SharedQueue<Packet>,
    session: &Shutdown,
) -> Result<()> {
    while let Some(frame) = frames.pop_until(session) {
        let packet = match encoder.encode(&frame)? {
            Some(packet) => packet,
            None => continue,
        };

        if !packets.push_until(&packet, session) {
            break;
        }
    }

    Ok(())
}
