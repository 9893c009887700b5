use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Read-only snapshot of one live track at the end of a processing cycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub id: u64,

    // reported centroid, in px
    pub x: f32,
    pub y: f32,
    pub size: f32,

    // px per filter time step
    pub velocity: (f32, f32),
    pub acceleration: (f32, f32),

    pub age: u32,
    pub total_visible_count: u32,
    pub consecutive_invisible_count: u32,
}

impl Track {
    #[inline]
    pub fn centroid(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }
}
