pub mod camera;
pub mod client;
pub mod codec;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod scene;
pub mod server;
pub mod settings;
pub mod shared_queue;
pub mod tracker;
pub mod vision;

mod circular_queue;
mod predictor;
mod track;

pub use circular_queue::CircularQueue;
pub use config::{QueueConfig, StreamConfig, TrackerConfig};
pub use detection::Detection;
pub use error::{Error, Result};
pub use frame::{Frame, Mask, Packet};
pub use predictor::KalmanPredictor;
pub use settings::CameraSettings;
pub use track::Track;

use std::sync::Arc;

pub trait Tracking {
    fn predict(&mut self);
    fn update(&mut self, detections: &[Detection]);
    fn tracks(&self) -> Arc<[Track]>;
}

/// Keeps identities of moving blobs across frames.
///
/// Call [`cycle`](MotionTracker::cycle) once per analysed frame.
pub struct MotionTracker {
    scene: scene::Scene,
}

impl MotionTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            scene: scene::Scene::new(config),
        }
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        self.scene.config()
    }

    #[inline]
    pub fn scene(&self) -> &scene::Scene {
        &self.scene
    }

    /// Predict, associate, drop lost tracks, and return the survivors.
    pub fn cycle(&mut self, detections: &[Detection]) -> Arc<[Track]> {
        self.predict();
        self.update(detections);
        self.tracks()
    }
}

impl Default for MotionTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl crate::Tracking for MotionTracker {
    #[inline]
    fn predict(&mut self) {
        self.scene.predict();
    }

    fn update(&mut self, detections: &[Detection]) {
        let cutoff = self.scene.config().dist_cutoff;

        self.scene.assign(detections, cutoff);

        let dropped = self.scene.prune();
        if dropped > 0 {
            log::debug!("dropped {} lost tracks, {} left", dropped, self.scene.len());
        }
    }

    #[inline]
    fn tracks(&self) -> Arc<[Track]> {
        self.scene.tracks().into()
    }
}
