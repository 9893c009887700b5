//! Capability seams for the external video codec.
//!
//! Encoding and decoding share nothing beyond resource setup, so they are two
//! narrow traits rather than one codec type. A [`CodecFactory`] builds them
//! from the negotiated [`CameraSettings`].

use std::fmt;

use crate::error::{Error, Result};
use crate::frame::{Frame, Packet};
use crate::settings::{CameraSettings, CODEC_FIELD_LEN};

/// Codec negotiated in the handshake. `none` means raw frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecName {
    None,
    Named(String),
}

impl CodecName {
    pub const NONE: &'static str = "none";

    /// Accepts printable ASCII up to the width of the wire field.
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidSettings("empty codec name".into()));
        }

        if name.len() > CODEC_FIELD_LEN {
            return Err(Error::InvalidSettings(format!(
                "codec name '{}' longer than {} bytes",
                name, CODEC_FIELD_LEN
            )));
        }

        if !name.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::InvalidSettings(format!(
                "codec name {:?} is not printable ascii",
                name
            )));
        }

        if name == Self::NONE {
            Ok(CodecName::None)
        } else {
            Ok(CodecName::Named(name.to_string()))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            CodecName::None => Self::NONE,
            CodecName::Named(name) => name,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, CodecName::None)
    }
}

impl fmt::Display for CodecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Encodes: Send {
    /// May yield nothing while the codec buffers frames internally; that is
    /// not an error.
    fn encode(&mut self, frame: &Frame) -> Result<Option<Packet>>;
}

pub trait Decodes: Send {
    /// `Some(bytes)` submits freshly received data and is only allowed while
    /// [`is_free`](Decodes::is_free) holds. `None` asks for more output from
    /// data already submitted.
    fn decode(&mut self, input: Option<&[u8]>) -> Result<Option<Frame>>;

    /// `false` while the decoder still holds unconsumed input.
    fn is_free(&self) -> bool;
}

/// Allocation failures are [`Error::Codec`] and fatal to the process.
pub trait CodecFactory: Send + Sync {
    fn encoder(&self, settings: &CameraSettings) -> Result<Box<dyn Encodes>>;
    fn decoder(&self, settings: &CameraSettings) -> Result<Box<dyn Decodes>>;
}

/// Factory for deployments that only ever stream raw frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawOnly;

impl CodecFactory for RawOnly {
    fn encoder(&self, settings: &CameraSettings) -> Result<Box<dyn Encodes>> {
        Err(Error::codec(format!(
            "no encoder available for '{}'",
            settings.codec
        )))
    }

    fn decoder(&self, settings: &CameraSettings) -> Result<Box<dyn Decodes>> {
        Err(Error::codec(format!(
            "no decoder available for '{}'",
            settings.codec
        )))
    }
}

/// Ships raw frames through the compressed-mode path unchanged.
///
/// Packets are frame bytes; the decoder reassembles them regardless of how
/// the transport split or merged them. Useful to exercise the encoder thread
/// and decoder hand-shaking without a real codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl CodecFactory for Passthrough {
    fn encoder(&self, _settings: &CameraSettings) -> Result<Box<dyn Encodes>> {
        Ok(Box::new(PassthroughEncoder))
    }

    fn decoder(&self, settings: &CameraSettings) -> Result<Box<dyn Decodes>> {
        Ok(Box::new(PassthroughDecoder::new(settings.width, settings.height)))
    }
}

#[derive(Debug, Default)]
pub struct PassthroughEncoder;

impl Encodes for PassthroughEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Option<Packet>> {
        Ok(Some(Packet::new(frame.as_bytes().into_owned())))
    }
}

#[derive(Debug)]
pub struct PassthroughDecoder {
    dims: (u32, u32),
    pending: Vec<u8>,
}

impl PassthroughDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dims: (width, height),
            pending: Vec::new(),
        }
    }

    #[inline]
    fn frame_size(&self) -> usize {
        Frame::byte_len_for(self.dims.0, self.dims.1)
    }
}

impl Decodes for PassthroughDecoder {
    fn decode(&mut self, input: Option<&[u8]>) -> Result<Option<Frame>> {
        if let Some(bytes) = input {
            self.pending.extend_from_slice(bytes);
        }

        let size = self.frame_size();
        if self.pending.len() < size {
            return Ok(None);
        }

        let rest = self.pending.split_off(size);
        let bytes = std::mem::replace(&mut self.pending, rest);

        Frame::from_raw(self.dims.0, self.dims.1, bytes).map(Some)
    }

    // busy while a whole frame is still buffered
    fn is_free(&self) -> bool {
        self.pending.len() < self.frame_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_decoder_splits_merged_packets() {
        let mut dec = PassthroughDecoder::new(2, 1);
        let data: Vec<u8> = (0..15).collect();

        assert!(dec.is_free());
        let first = dec.decode(Some(&data)).unwrap().unwrap();
        assert_eq!(first.as_bytes().as_ref(), &data[..6]);

        assert!(!dec.is_free());
        let second = dec.decode(None).unwrap().unwrap();
        assert_eq!(second.as_bytes().as_ref(), &data[6..12]);

        assert!(dec.is_free());
        assert!(dec.decode(None).unwrap().is_none());

        let third = dec.decode(Some(&[15, 16, 17])).unwrap().unwrap();
        assert_eq!(third.as_bytes().as_ref(), &[12, 13, 14, 15, 16, 17]);
    }

    #[test]
    fn parses_none_and_named() {
        assert_eq!(CodecName::parse("none").unwrap(), CodecName::None);
        assert_eq!(
            CodecName::parse("mpeg2video").unwrap(),
            CodecName::Named("mpeg2video".into())
        );
        assert!(CodecName::parse("none").unwrap().is_none());
        assert_eq!(CodecName::parse("mpeg4").unwrap().to_string(), "mpeg4");
    }

    #[test]
    fn rejects_names_that_do_not_fit_the_wire() {
        assert!(CodecName::parse("").is_err());
        assert!(CodecName::parse("a-codec-name-that-is-too-long").is_err());
        assert!(CodecName::parse("h264\0").is_err());
        assert!(CodecName::parse("hévc").is_err());
    }

    #[test]
    fn raw_only_refuses_codecs() {
        let settings = CameraSettings::new(640, 480, 30, CodecName::parse("mpeg4").unwrap());
        let err = RawOnly.encoder(&settings).err().unwrap();
        assert!(err.is_fatal());
    }
}
