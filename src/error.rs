use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    #[error("Peer closed the connection")]
    PeerClosed,

    #[error("Handshake Error: {0}")]
    Handshake(String),

    #[error("Invalid camera settings: {0}")]
    InvalidSettings(String),

    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Codec Error: {0}")]
    Codec(String),

    #[error("Camera Error: {0}")]
    Camera(String),
}

impl Error {
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        Self::Codec(msg.into())
    }

    pub fn camera<S: Into<String>>(msg: S) -> Self {
        Self::Camera(msg.into())
    }

    pub fn handshake<S: Into<String>>(msg: S) -> Self {
        Self::Handshake(msg.into())
    }

    /// Resource failures (codec or camera) leave the process in a state it
    /// must not continue from. Everything else only ends the current session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Codec(_) | Error::Camera(_))
    }

    pub fn is_peer_closed(&self) -> bool {
        match self {
            Error::PeerClosed => true,
            Error::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::WriteZero
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_errors_are_fatal() {
        assert!(Error::codec("mpeg4 not found").is_fatal());
        assert!(Error::camera("blank frame").is_fatal());
        assert!(!Error::PeerClosed.is_fatal());
        assert!(!Error::Io(io::Error::new(io::ErrorKind::Other, "boom")).is_fatal());
    }

    #[test]
    fn broken_pipe_counts_as_peer_closed() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(err.is_peer_closed());

        let err: Error = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert!(!err.is_peer_closed());
    }
}
