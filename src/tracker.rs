use std::sync::atomic::{AtomicU64, Ordering};

use super::predictor::KalmanPredictor;
use crate::config::TrackerConfig;
use crate::Detection;
use nalgebra as na;

static SEQ_ID: AtomicU64 = AtomicU64::new(0);

/// Next id from the process-wide sequence. Ids are never reused.
#[inline]
pub fn next_id() -> u64 {
    SEQ_ID.fetch_add(1, Ordering::SeqCst)
}

/// One physical object followed across frames.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    pub id: u64,
    pub centroid: Detection,
    pub predictor: KalmanPredictor<f32>,
    pub age: u32,
    pub total_visible_count: u32,
    pub consecutive_invisible_count: u32,
    pub matched: bool,
}

impl TrackedObject {
    pub fn new(id: u64, det: &Detection) -> Self {
        Self {
            id,
            centroid: *det,
            predictor: KalmanPredictor::new(det.point()),
            age: 1,
            total_visible_count: 1,
            consecutive_invisible_count: 0,
            matched: true,
        }
    }

    /// Steps the motion model; the reported centroid follows the prediction.
    #[inline]
    pub fn predict(&mut self) -> na::Point2<f32> {
        let pt = self.predictor.predict();
        self.centroid.x = pt.x;
        self.centroid.y = pt.y;

        pt
    }

    /// Position the association step compares detections against.
    #[inline]
    pub fn position(&self) -> na::Point2<f32> {
        self.predictor.position()
    }

    pub fn hit(&mut self, det: &Detection) {
        self.predictor.correct(det.point());
        self.centroid = *det;
        self.age += 1;
        self.total_visible_count += 1;
        self.consecutive_invisible_count = 0;
        self.matched = true;
    }

    pub fn miss(&mut self) {
        self.age += 1;
        self.consecutive_invisible_count += 1;
    }

    #[inline]
    pub fn visibility(&self) -> f32 {
        self.total_visible_count as f32 / self.age.max(1) as f32
    }

    /// Lost after too many consecutive misses, or while still young with a
    /// visibility ratio below `min_visibility`.
    ///
    /// The ratio is computed in floating point, not with integer division.
    /// Integer division rounds any young track with a single miss down to
    /// zero and drops it; here a track aged 5 seen 4 times (0.8) survives.
    pub fn is_lost(&self, config: &TrackerConfig) -> bool {
        self.consecutive_invisible_count >= config.invisible_for_too_long
            || (self.age < config.age_threshold && self.visibility() < config.min_visibility)
    }
}

impl From<&TrackedObject> for crate::Track {
    fn from(t: &TrackedObject) -> crate::Track {
        let vel = t.predictor.velocity();
        let acc = t.predictor.acceleration();

        crate::Track {
            id: t.id,
            x: t.centroid.x,
            y: t.centroid.y,
            size: t.centroid.size,
            velocity: (vel.x, vel.y),
            acceleration: (acc.x, acc.y),
            age: t.age,
            total_visible_count: t.total_visible_count,
            consecutive_invisible_count: t.consecutive_invisible_count,
        }
    }
}
