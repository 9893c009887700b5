use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Centroid of one foreground blob in a single frame. Carries no identity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    /// Blob diameter in px, zero when the vision service does not report it.
    #[serde(rename = "s", default)]
    pub size: f32,
}

impl Detection {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, size: 0.0 }
    }

    #[inline]
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    #[inline(always)]
    pub fn point(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn distance(&self, pt: &na::Point2<f32>) -> f32 {
        na::distance(&self.point(), pt)
    }
}

impl From<(f32, f32)> for Detection {
    fn from((x, y): (f32, f32)) -> Self {
        Detection::new(x, y)
    }
}
