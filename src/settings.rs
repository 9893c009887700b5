//! Camera settings record exchanged once, right after connect.
//!
//! ```text
//! offset  size  field
//!      0     4  height   (u32, little endian)
//!      4     4  width    (u32, little endian)
//!      8     4  fps      (u32, little endian)
//!     12    20  codec    (ascii, zero padded)
//! ```

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::CodecName;
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::frame::{Frame, CHANNELS};

pub const CODEC_FIELD_LEN: usize = 20;
pub const WIRE_SIZE: usize = 4 + 4 + 4 + CODEC_FIELD_LEN;

/// Largest accepted width or height.
pub const MAX_DIMENSION: u32 = 16_384;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    pub height: u32,
    pub width: u32,
    pub fps: u32,
    pub codec: CodecName,
}

impl CameraSettings {
    pub fn new(width: u32, height: u32, fps: u32, codec: CodecName) -> Self {
        Self {
            height,
            width,
            fps,
            codec,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Result<Self> {
        let settings = Self::new(
            config.width,
            config.height,
            config.fps,
            CodecName::parse(&config.codec)?,
        );
        settings.validate()?;

        Ok(settings)
    }

    /// Rejects empty frames and frames too large to buffer.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidSettings(format!(
                "frame size {}x{} is empty",
                self.width, self.height
            )));
        }

        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(Error::InvalidSettings(format!(
                "frame size {}x{} exceeds {} px per side",
                self.width, self.height, MAX_DIMENSION
            )));
        }

        let bytes = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(CHANNELS));
        if bytes.is_none() {
            return Err(Error::InvalidSettings(format!(
                "frame size {}x{} does not fit in memory",
                self.width, self.height
            )));
        }

        Ok(())
    }

    /// Bytes in one raw interleaved BGR frame.
    #[inline]
    pub fn frame_size(&self) -> usize {
        Frame::byte_len_for(self.width, self.height)
    }

    /// Bit-rate hint for encoders: 24 bpp at the negotiated rate, divided by ten.
    #[inline]
    pub fn bit_rate(&self) -> u64 {
        (self.width as u64 * self.height as u64)
            .saturating_mul(self.fps as u64)
            .saturating_mul(24)
            / 10
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        !self.codec.is_none()
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(WIRE_SIZE);

        buf.put_u32_le(self.height);
        buf.put_u32_le(self.width);
        buf.put_u32_le(self.fps);

        let name = self.codec.as_str().as_bytes();
        let len = name.len().min(CODEC_FIELD_LEN);
        buf.put_slice(&name[..len]);
        buf.put_bytes(0, CODEC_FIELD_LEN - len);

        buf.freeze()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != WIRE_SIZE {
            return Err(Error::handshake(format!(
                "settings record is {} bytes, expected {}",
                data.len(),
                WIRE_SIZE
            )));
        }

        let mut buf = data;
        let height = buf.get_u32_le();
        let width = buf.get_u32_le();
        let fps = buf.get_u32_le();

        let field = &buf[..CODEC_FIELD_LEN];
        let end = field.iter().position(|b| *b == 0).unwrap_or(CODEC_FIELD_LEN);
        let name = std::str::from_utf8(&field[..end])
            .map_err(|_| Error::handshake("codec name is not ascii"))?;

        let settings = Self {
            height,
            width,
            fps,
            codec: CodecName::parse(name)?,
        };
        settings.validate()?;

        Ok(settings)
    }

    /// Sends the record in a single write.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.encode())?;
        w.flush()?;

        Ok(())
    }

    /// Reads exactly one record. A peer that hangs up first yields
    /// [`Error::PeerClosed`].
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut buf = [0u8; WIRE_SIZE];

        r.read_exact(&mut buf).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::PeerClosed,
            _ => Error::Io(err),
        })?;

        Self::decode(&buf)
    }
}
