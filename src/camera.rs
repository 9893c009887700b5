use crate::error::Result;
use crate::frame::Frame;
use crate::settings::CameraSettings;

/// The physical camera behind a [`CameraServer`](crate::server::CameraServer).
///
/// Failures here are [`Error::Camera`](crate::error::Error::Camera) and end
/// the server: a camera that stops producing frames is not recoverable by
/// waiting for the next client.
pub trait FrameSource: Send {
    /// Applies the resolution and rate a client asked for.
    fn configure(&mut self, settings: &CameraSettings) -> Result<()>;

    /// Blocks until the next frame is captured.
    fn read(&mut self) -> Result<Frame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    #[inline]
    fn configure(&mut self, settings: &CameraSettings) -> Result<()> {
        (**self).configure(settings)
    }

    #[inline]
    fn read(&mut self) -> Result<Frame> {
        (**self).read()
    }
}
