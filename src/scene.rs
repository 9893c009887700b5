use crate::config::TrackerConfig;
use crate::tracker::{next_id, TrackedObject};
use crate::Detection;

use nalgebra as na;

/// The set of live tracks and the per-cycle association / lifecycle rules.
///
/// A cycle is `predict`, then `assign`, then `prune`. None of these fail.
pub struct Scene {
    pub tracks: Vec<TrackedObject>,
    config: TrackerConfig,
}

impl Scene {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::with_capacity(64),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Steps every track's motion model forward one time unit.
    pub fn predict(&mut self) {
        for t in &mut self.tracks {
            t.predict();
        }
    }

    /// Greedy first-fit association.
    ///
    /// Each detection, in input order, goes to the first track (in insertion
    /// order) whose position lies strictly within `dist_cutoff`, even if a
    /// later track is closer. Unclaimed detections seed new tracks, which later
    /// detections of the same pass may claim. Tracks left unmatched are aged.
    pub fn assign(&mut self, detections: &[Detection], dist_cutoff: f32) {
        for t in &mut self.tracks {
            t.matched = false;
        }

        for det in detections {
            let pt = det.point();
            let found = self
                .tracks
                .iter_mut()
                .find(|t| na::distance(&t.position(), &pt) < dist_cutoff);

            if let Some(t) = found {
                t.hit(det);
            } else {
                let obj = TrackedObject::new(next_id(), det);
                log::trace!("new track {} at ({:.1}, {:.1})", obj.id, det.x, det.y);
                self.tracks.push(obj);
            }
        }

        for t in self.tracks.iter_mut().filter(|t| !t.matched) {
            t.miss();
        }
    }

    /// Drops lost tracks, compacting in place until a full pass removes
    /// nothing. Survivors keep their relative order. Returns the number removed.
    pub fn prune(&mut self) -> usize {
        let config = self.config;
        let before = self.tracks.len();

        loop {
            let len = self.tracks.len();

            self.tracks.retain(|t| {
                let lost = t.is_lost(&config);
                if lost {
                    log::trace!(
                        "dropping track {} (age {}, visible {}, invisible {})",
                        t.id,
                        t.age,
                        t.total_visible_count,
                        t.consecutive_invisible_count
                    );
                }

                !lost
            });

            if self.tracks.len() == len {
                break;
            }
        }

        before - self.tracks.len()
    }

    pub fn tracks(&self) -> Vec<crate::Track> {
        self.tracks.iter().map(Into::into).collect()
    }

    pub fn centroids(&self) -> Vec<Detection> {
        self.tracks.iter().map(|t| t.centroid).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
