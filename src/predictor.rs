use nalgebra as na;
use num_traits::Float;

// Hand-tuned for the deployed camera; not derived from the frame rate.
const TIME_STEP: f64 = 2.0;
const PROCESS_NOISE: f64 = 1e-5;
const MEASUREMENT_NOISE: f64 = 1e-1;
const INITIAL_ERROR_COV: f64 = 1.0;

type StateVector<F> = na::SVector<F, 6>;
type StateMatrix<F> = na::SMatrix<F, 6, 6>;
type MeasurementMatrix<F> = na::SMatrix<F, 2, 6>;

/// Constant-acceleration Kalman filter over `[x, y, vx, vy, ax, ay]`,
/// observing position only.
#[derive(Debug, Clone)]
pub struct KalmanPredictor<F>
where
    F: na::RealField + Float,
{
    state: StateVector<F>,
    error_cov: StateMatrix<F>,
    transition: StateMatrix<F>,
    measurement: MeasurementMatrix<F>,
    process_noise: StateMatrix<F>,
    measurement_noise: na::Matrix2<F>,
}

impl<F> KalmanPredictor<F>
where
    F: na::RealField + Float,
{
    /// Seeds the filter at `pos` with zero velocity and acceleration.
    pub fn new(pos: na::Point2<F>) -> Self {
        let dt: F = na::convert(TIME_STEP);

        let mut transition = StateMatrix::identity();
        transition[(0, 2)] = dt;
        transition[(1, 3)] = dt;
        transition[(0, 4)] = dt * dt;
        transition[(1, 5)] = dt * dt;
        transition[(2, 4)] = dt;
        transition[(3, 5)] = dt;

        let mut state = StateVector::zeros();
        state[0] = pos.x;
        state[1] = pos.y;

        Self {
            state,
            error_cov: StateMatrix::identity() * na::convert::<f64, F>(INITIAL_ERROR_COV),
            transition,
            measurement: MeasurementMatrix::identity(),
            process_noise: StateMatrix::identity() * na::convert::<f64, F>(PROCESS_NOISE),
            measurement_noise: na::Matrix2::identity()
                * na::convert::<f64, F>(MEASUREMENT_NOISE),
        }
    }

    /// Advances the state by one time step and returns the predicted position.
    pub fn predict(&mut self) -> na::Point2<F> {
        self.state = self.transition * self.state;
        self.error_cov =
            self.transition * self.error_cov * self.transition.transpose() + self.process_noise;

        self.position()
    }

    /// Blends a measured position into the state.
    ///
    /// Non-finite measurements and a singular innovation covariance leave the
    /// state untouched.
    pub fn correct(&mut self, pos: na::Point2<F>) {
        if !(Float::is_finite(pos.x) && Float::is_finite(pos.y)) {
            return;
        }

        let z = na::Vector2::new(pos.x, pos.y);
        let innovation = z - self.measurement * self.state;
        let s = self.measurement * self.error_cov * self.measurement.transpose()
            + self.measurement_noise;

        let s_inv = if let Some(inv) = s.try_inverse() {
            inv
        } else {
            return;
        };

        let gain = self.error_cov * self.measurement.transpose() * s_inv;

        self.state = self.state + gain * innovation;
        self.error_cov = self.error_cov - gain * self.measurement * self.error_cov;
    }

    #[inline]
    pub fn position(&self) -> na::Point2<F> {
        na::Point2::new(self.state[0], self.state[1])
    }

    #[inline]
    pub fn velocity(&self) -> na::Vector2<F> {
        na::Vector2::new(self.state[2], self.state[3])
    }

    #[inline]
    pub fn acceleration(&self) -> na::Vector2<F> {
        na::Vector2::new(self.state[4], self.state[5])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn stationary_object_stays_put() {
        let mut kf = KalmanPredictor::new(na::Point2::new(10.0f32, 10.0));

        let p = kf.predict();
        assert_abs_diff_eq!(p.x, 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(kf.velocity().norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn correction_pulls_towards_measurement() {
        let mut kf = KalmanPredictor::new(na::Point2::new(10.0f32, 10.0));
        kf.predict();
        kf.correct(na::Point2::new(11.0, 9.0));

        let p = kf.position();
        assert!(p.x > 10.9 && p.x < 11.0, "x = {}", p.x);
        assert!(p.y < 9.1 && p.y > 9.0, "y = {}", p.y);
    }

    #[test]
    fn learns_constant_velocity() {
        let mut kf = KalmanPredictor::new(na::Point2::new(0.0f32, 100.0));

        for step in 1..=30 {
            kf.predict();
            kf.correct(na::Point2::new(step as f32 * 4.0, 100.0));
        }

        let next = kf.predict();
        assert_abs_diff_eq!(next.x, 124.0, epsilon = 1.0);
        assert_abs_diff_eq!(next.y, 100.0, epsilon = 1.0);
        assert!(kf.velocity().x > 0.0);
    }

    #[test]
    fn ignores_non_finite_measurement() {
        let mut kf = KalmanPredictor::new(na::Point2::new(3.0f32, 4.0));
        kf.predict();
        kf.correct(na::Point2::new(f32::NAN, 4.0));

        assert_abs_diff_eq!(kf.position().x, 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(kf.acceleration().norm(), 0.0, epsilon = 1e-6);
    }
}
