use std::borrow::Cow;

use bytes::Bytes;
use ndarray::{s, Array2, Array3, ArrayView3};

use crate::error::{Error, Result};

pub const CHANNELS: usize = 3;

/// An owned camera image: `height x width` pixels of interleaved BGR bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    dims: (u32, u32),
    data: Array3<u8>,
}

impl Frame {
    /// All-black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dims: (width, height),
            data: Array3::zeros((height as usize, width as usize, CHANNELS)),
        }
    }

    /// Wraps a `[B G R  B G R ...]` row-major buffer of exactly
    /// `width * height * 3` bytes.
    pub fn from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len_for(width, height);
        let actual = bytes.len();

        if actual != expected {
            return Err(Error::FrameSize { expected, actual });
        }

        let data = Array3::from_shape_vec((height as usize, width as usize, CHANNELS), bytes)
            .map_err(|_| Error::FrameSize { expected, actual })?;

        Ok(Self {
            dims: (width, height),
            data,
        })
    }

    #[inline]
    pub fn byte_len_for(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.dims.0
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.dims.1
    }

    /// `(width, height)`
    #[inline]
    pub fn dims(&self) -> (u32, u32) {
        self.dims
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// The interleaved wire representation.
    pub fn as_bytes(&self) -> Cow<'_, [u8]> {
        match self.data.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(self.data.iter().copied().collect()),
        }
    }

    pub fn into_raw(self) -> Vec<u8> {
        if self.data.is_standard_layout() {
            self.data.into_raw_vec()
        } else {
            self.data.iter().copied().collect()
        }
    }

    /// `[b, g, r]` at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }

        let (x, y) = (x as usize, y as usize);

        Some([
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
        ])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
        if x >= self.width() || y >= self.height() {
            return;
        }

        let (x, y) = (x as usize, y as usize);
        for (c, value) in bgr.iter().enumerate() {
            self.data[[y, x, c]] = *value;
        }
    }

    /// Rotated by 180 degrees, for cameras mounted upside down.
    pub fn flipped(&self) -> Frame {
        let data = self
            .data
            .slice(s![..;-1, ..;-1, ..])
            .as_standard_layout()
            .into_owned();

        Frame {
            dims: self.dims,
            data,
        }
    }
}

/// Binary foreground mask, 255 for foreground and 0 for background.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<u8>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: Array2::zeros((height as usize, width as usize)),
        }
    }

    pub fn from_array(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// `(width, height)`
    #[inline]
    pub fn dims(&self) -> (u32, u32) {
        let (rows, cols) = self.data.dim();
        (cols as u32, rows as u32)
    }

    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.data
            .get((y as usize, x as usize))
            .map_or(false, |v| *v > 0)
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        if let Some(v) = self.data.get_mut((y as usize, x as usize)) {
            *v = if foreground { 255 } else { 0 };
        }
    }

    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|v| **v > 0).count()
    }

    #[inline]
    pub fn data(&self) -> &Array2<u8> {
        &self.data
    }
}

/// One unit of codec output, carried with its explicit length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    data: Bytes,
}

impl Packet {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}
