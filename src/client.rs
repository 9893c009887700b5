//! Receiving side of the camera stream.

use std::io::{self, Read, Write};
use std::net::{Shutdown as NetShutdown, TcpStream};
use std::time::Duration;

use crate::codec::{CodecFactory, Decodes};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::settings::CameraSettings;

/// Upper bound on a single blocking receive, so callers regain control and
/// can notice a shutdown even when the server stalls.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Connection to a camera server that yields one complete frame per
/// [`read_frame`](StreamClient::read_frame).
pub struct StreamClient<S = TcpStream> {
    stream: S,
    peer: String,
    settings: CameraSettings,
    decoder: Option<Box<dyn Decodes>>,
    buffer: Vec<u8>,
    // raw bytes of a frame interrupted by a transient error
    filled: usize,
    open: bool,
}

impl StreamClient<TcpStream> {
    /// Connects, sends the camera settings and prepares the decoder.
    ///
    /// Decoder construction failures are fatal ([`Error::Codec`]); connection
    /// failures are returned as [`Error::Io`].
    pub fn connect(config: &StreamConfig, codecs: &dyn CodecFactory) -> Result<Self> {
        let settings = CameraSettings::from_config(config)?;
        let peer = config.peer_addr();

        let decoder = if settings.is_compressed() {
            Some(codecs.decoder(&settings)?)
        } else {
            None
        };

        let stream = TcpStream::connect(&peer).map_err(|err| {
            log::error!("unable to connect to {}: {}", peer, err);
            Error::Io(err)
        })?;
        stream.set_read_timeout(Some(DEFAULT_READ_TIMEOUT))?;

        let mut client = Self::from_stream(stream, settings, decoder).map_err(|err| {
            log::error!("camera setup with {} failed: {}", peer, err);
            err
        })?;
        client.peer = peer;

        log::info!(
            "streaming from {}: {}x{} @ {} fps, codec {}",
            client.peer,
            client.settings.width,
            client.settings.height,
            client.settings.fps,
            client.settings.codec
        );

        Ok(client)
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Closes the link; the server goes back to listening.
    pub fn release(&mut self) {
        if self.open {
            let _ = self.stream.shutdown(NetShutdown::Both);
            self.open = false;
            log::info!("released stream from {}", self.peer);
        }
    }
}

impl<S: Read + Write> StreamClient<S> {
    /// Sends `settings` over an already connected transport.
    pub fn from_stream(
        mut stream: S,
        settings: CameraSettings,
        decoder: Option<Box<dyn Decodes>>,
    ) -> Result<Self> {
        settings.validate()?;
        settings.write_to(&mut stream)?;

        Ok(Self {
            stream,
            buffer: vec![0; settings.frame_size()],
            peer: String::from("stream"),
            settings,
            decoder,
            filled: 0,
            open: true,
        })
    }

    /// Blocks until one full frame has been received and, when compressed,
    /// decoded.
    ///
    /// [`Error::PeerClosed`] ends the session; other errors are transient and
    /// the call may be retried.
    pub fn read_frame(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(Error::PeerClosed);
        }

        let result = if self.decoder.is_some() {
            self.read_compressed()
        } else {
            self.read_raw()
        };

        if let Err(err) = &result {
            if err.is_peer_closed() {
                self.open = false;
                log::warn!("connection to {} closed", self.peer);
            } else if is_timeout(err) {
                log::trace!("recv from {} timed out", self.peer);
            } else {
                log::warn!("recv from {} failed: {}", self.peer, err);
            }
        }

        result
    }

    // A single receive may return any part of the frame, so keep asking for
    // the remainder until all `height * width * 3` bytes are in.
    fn read_raw(&mut self) -> Result<Frame> {
        let size = self.settings.frame_size();

        while self.filled < size {
            self.filled += recv(&mut self.stream, &mut self.buffer[self.filled..size])?;
        }

        self.filled = 0;

        Frame::from_raw(
            self.settings.width,
            self.settings.height,
            self.buffer[..size].to_vec(),
        )
    }

    // One receive may carry part of a packet, one packet or several. Fresh
    // bytes are only read once the decoder has drained what it was given.
    fn read_compressed(&mut self) -> Result<Frame> {
        let decoder = match self.decoder.as_mut() {
            Some(decoder) => decoder,
            None => return Err(Error::codec("no decoder configured")),
        };

        loop {
            let frame = if decoder.is_free() {
                let n = recv(&mut self.stream, &mut self.buffer)?;
                decoder.decode(Some(&self.buffer[..n]))?
            } else {
                decoder.decode(None)?
            };

            if let Some(frame) = frame {
                return Ok(frame);
            }
        }
    }

    #[inline]
    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.settings.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.settings.height
    }

    #[inline]
    pub fn fps(&self) -> u32 {
        self.settings.fps
    }

    #[inline]
    pub fn peer(&self) -> &str {
        &self.peer
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }
}

fn recv<S: Read>(stream: &mut S, buf: &mut [u8]) -> Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(0) => return Err(Error::PeerClosed),
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(Error::Io(err)),
        }
    }
}

pub(crate) fn is_timeout(err: &Error) -> bool {
    match err {
        Error::Io(err) => matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecName, PassthroughDecoder};
    use crate::settings::WIRE_SIZE;
    use std::collections::VecDeque;

    /// Transport that replays scripted receive results.
    struct Scripted {
        reads: VecDeque<io::Result<Vec<u8>>>,
        written: Vec<u8>,
    }

    impl Scripted {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                written: Vec::new(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                None => Ok(0),
                Some(Err(err)) => Err(err),
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn settings(codec: &str) -> CameraSettings {
        CameraSettings::new(4, 3, 30, CodecName::parse(codec).unwrap())
    }

    fn frame_bytes(seed: u8) -> Vec<u8> {
        (0..36).map(|i| seed.wrapping_add(i)).collect()
    }

    #[test]
    fn handshake_is_written_first() {
        let client =
            StreamClient::from_stream(Scripted::new(vec![]), settings("none"), None).unwrap();

        assert_eq!(client.stream.written.len(), WIRE_SIZE);
        assert_eq!(
            CameraSettings::decode(&client.stream.written).unwrap(),
            settings("none")
        );
        assert!(client.is_open());
    }

    #[test]
    fn raw_frame_reassembled_from_unequal_chunks() {
        let bytes = frame_bytes(0);
        let transport = Scripted::new(vec![
            Ok(bytes[..5].to_vec()),
            Ok(bytes[5..25].to_vec()),
            Ok(bytes[25..].to_vec()),
        ]);

        let mut client = StreamClient::from_stream(transport, settings("none"), None).unwrap();
        let frame = client.read_frame().unwrap();

        assert_eq!(frame.dims(), (4, 3));
        assert_eq!(frame.as_bytes().as_ref(), bytes.as_slice());
    }

    #[test]
    fn back_to_back_raw_frames_stay_aligned() {
        let mut stream = frame_bytes(0);
        stream.extend(frame_bytes(100));
        let transport = Scripted::new(vec![Ok(stream[..50].to_vec()), Ok(stream[50..].to_vec())]);

        let mut client = StreamClient::from_stream(transport, settings("none"), None).unwrap();

        assert_eq!(client.read_frame().unwrap().as_bytes().as_ref(), frame_bytes(0).as_slice());
        assert_eq!(client.read_frame().unwrap().as_bytes().as_ref(), frame_bytes(100).as_slice());
    }

    #[test]
    fn zero_byte_read_closes_the_session() {
        let bytes = frame_bytes(0);
        let transport = Scripted::new(vec![Ok(bytes[..10].to_vec())]);

        let mut client = StreamClient::from_stream(transport, settings("none"), None).unwrap();

        assert!(matches!(client.read_frame(), Err(Error::PeerClosed)));
        assert!(!client.is_open());
        assert!(matches!(client.read_frame(), Err(Error::PeerClosed)));
    }

    #[test]
    fn transient_error_resumes_partial_frame() {
        let bytes = frame_bytes(7);
        let transport = Scripted::new(vec![
            Ok(bytes[..10].to_vec()),
            Err(io::Error::new(io::ErrorKind::TimedOut, "slow")),
            Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
            Ok(bytes[10..].to_vec()),
        ]);

        let mut client = StreamClient::from_stream(transport, settings("none"), None).unwrap();

        let err = client.read_frame().unwrap_err();
        assert!(is_timeout(&err));
        assert!(client.is_open());

        let frame = client.read_frame().unwrap();
        assert_eq!(frame.as_bytes().as_ref(), bytes.as_slice());
    }

    #[test]
    fn compressed_drains_decoder_before_next_recv() {
        let mut merged = frame_bytes(0);
        merged.extend(frame_bytes(50));
        merged.extend(&frame_bytes(90)[..4]);

        // packet boundaries fall mid-receive
        let transport = Scripted::new(vec![
            Ok(merged[..36].to_vec()),
            Ok(merged[36..].to_vec()),
            Ok(frame_bytes(90)[4..].to_vec()),
        ]);
        let decoder: Box<dyn Decodes> = Box::new(PassthroughDecoder::new(4, 3));

        let mut client =
            StreamClient::from_stream(transport, settings("mpeg4"), Some(decoder)).unwrap();

        assert_eq!(client.read_frame().unwrap().as_bytes().as_ref(), frame_bytes(0).as_slice());
        assert_eq!(client.read_frame().unwrap().as_bytes().as_ref(), frame_bytes(50).as_slice());
        assert_eq!(client.read_frame().unwrap().as_bytes().as_ref(), frame_bytes(90).as_slice());
        assert!(matches!(client.read_frame(), Err(Error::PeerClosed)));
    }

    /// Every input byte decodes to one frame filled with that byte.
    struct BytePerFrame {
        pending: VecDeque<u8>,
    }

    impl Decodes for BytePerFrame {
        fn decode(&mut self, input: Option<&[u8]>) -> Result<Option<Frame>> {
            if let Some(bytes) = input {
                if !self.pending.is_empty() {
                    return Err(Error::codec("fed while busy"));
                }
                self.pending.extend(bytes);
            }

            Ok(self
                .pending
                .pop_front()
                .map(|b| Frame::from_raw(4, 3, vec![b; 36]).unwrap()))
        }

        fn is_free(&self) -> bool {
            self.pending.is_empty()
        }
    }

    #[test]
    fn one_receive_yielding_many_frames_is_drained_first() {
        let transport = Scripted::new(vec![Ok(vec![1, 2, 3, 4, 5]), Ok(vec![6])]);
        let decoder: Box<dyn Decodes> = Box::new(BytePerFrame {
            pending: VecDeque::new(),
        });

        let mut client =
            StreamClient::from_stream(transport, settings("mpeg4"), Some(decoder)).unwrap();

        let values: Vec<u8> = (0..6)
            .map(|_| client.read_frame().unwrap().pixel(0, 0).unwrap()[0])
            .collect();

        assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
        assert!(client.stream.reads.is_empty());
        assert!(matches!(client.read_frame(), Err(Error::PeerClosed)));
    }

    #[test]
    fn oversized_settings_are_refused_before_allocation() {
        let huge = CameraSettings::new(u32::MAX, u32::MAX, 30, CodecName::None);
        let result = StreamClient::from_stream(Scripted::new(vec![]), huge, None);

        assert!(matches!(result, Err(Error::InvalidSettings(_))));
    }
}
