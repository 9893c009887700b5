//! Runtime configuration for the stream, the tracker and the hand-off queues.

use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

/// Port the camera server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 20006;

/// Parameters the client negotiates with the camera server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub height: u32,
    pub width: u32,
    pub fps: u32,
    pub ip: String,
    pub port: u16,
    /// `"none"` streams raw frames, anything else names a codec.
    pub codec: String,
    /// Rotate every received frame by 180 degrees (camera mounted upside down).
    pub flip: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            height: 480,
            width: 640,
            fps: 20,
            ip: "192.168.0.112".to_string(),
            port: DEFAULT_PORT,
            codec: "mpeg4".to_string(),
            flip: true,
        }
    }
}

impl StreamConfig {
    pub fn peer(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.ip = ip.into();
        self.port = port;
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    #[inline]
    pub fn peer_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// Association and retention thresholds of the track engine.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum distance between a predicted track position and a detection
    /// for the two to be associated.
    pub dist_cutoff: f32,
    /// A track unmatched for this many consecutive cycles is dropped.
    pub invisible_for_too_long: u32,
    /// Tracks younger than this are dropped when their visibility is low.
    pub age_threshold: u32,
    /// Minimum `total_visible_count / age` for a young track to survive.
    pub min_visibility: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            dist_cutoff: 200.0,
            invisible_for_too_long: 20,
            age_threshold: 8,
            min_visibility: 0.6,
        }
    }
}

impl TrackerConfig {
    pub fn dist_cutoff(mut self, cutoff: f32) -> Self {
        self.dist_cutoff = cutoff;
        self
    }

    pub fn invisible_for_too_long(mut self, cycles: u32) -> Self {
        self.invisible_for_too_long = cycles;
        self
    }

    pub fn age_threshold(mut self, age: u32) -> Self {
        self.age_threshold = age;
        self
    }
}

/// Sizing and pacing of a frame or packet queue.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    /// Sleep between two probes of a retry loop.
    pub retry_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            retry_interval: Duration::from_millis(1),
        }
    }
}

impl QueueConfig {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}
