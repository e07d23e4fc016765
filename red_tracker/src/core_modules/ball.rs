// THEORY:
// The `Ball` is what the player steers. It has no position of its own: wherever
// the particle filter's estimate is, that is where the ball is drawn and where
// collisions are checked. Its shape only contributes a size, reduced to a single
// bounding radius for collision tests.

use crate::core_modules::particle_filter::{FilterConfig, ParticleFilter};
use crate::core_modules::point::{Canvas, Point2D};
use crate::core_modules::shape::Shape;
use crate::error::Result;
use rand::rngs::StdRng;
use rand::Rng;

/// The steered game object: a shape whose position is whatever the particle
/// filter currently estimates.
pub struct Ball<R: Rng = StdRng> {
    shape: Shape,
    filter: ParticleFilter<R>,
}

impl Ball<StdRng> {
    pub fn new(shape: Shape, start: Point2D, config: FilterConfig, canvas: Canvas) -> Result<Self> {
        Ok(Self::with_filter(shape, ParticleFilter::new(start, config, canvas)?))
    }
}

impl<R: Rng> Ball<R> {
    pub fn with_filter(shape: Shape, filter: ParticleFilter<R>) -> Self {
        Self { shape, filter }
    }

    pub fn position(&self) -> Point2D {
        self.filter.get_position()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Collision radius of the ball's shape.
    pub fn radius(&self) -> f64 {
        self.shape.bounding_radius()
    }

    /// Feeds one frame's detection (or lack of one) into the filter.
    pub fn update(&mut self, measurement: Option<Point2D>) {
        self.filter.update_default(measurement);
    }

    /// Whether the ball's bounding circle overlaps a circle of `radius` at `center`.
    pub fn collides_with(&self, center: Point2D, radius: f64) -> bool {
        self.position().distance(&center) < self.radius() + radius
    }

    pub fn filter(&self) -> &ParticleFilter<R> {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::particle::Particle;
    use crate::core_modules::shape::ShapeKind;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn still_ball(kind: ShapeKind, at: Point2D) -> Ball<StdRng> {
        let config = FilterConfig {
            motion_noise_std: 0.0,
            accel_noise_std: 0.0,
            ..FilterConfig::default()
        };
        let canvas = Canvas::new(640, 480).expect("valid canvas");
        let particles = vec![Particle::new(at.x, at.y, 0.0, 0.0); 4];
        let filter = ParticleFilter::from_particles(particles, config, canvas, StdRng::seed_from_u64(7))
            .expect("valid filter");
        Ball::with_filter(Shape::ball(kind), filter)
    }

    #[test]
    fn ball_sits_at_the_filter_estimate() {
        let ball = still_ball(ShapeKind::Circle, Point2D::new(200.0, 150.0));
        assert_eq!(ball.position(), Point2D::new(200.0, 150.0));
        assert_relative_eq!(ball.radius(), 50.0);
    }

    #[test]
    fn ball_without_noise_stays_put_when_nothing_is_seen() {
        let mut ball = still_ball(ShapeKind::Square, Point2D::new(320.0, 240.0));
        for _ in 0..5 {
            ball.update(None);
        }
        assert_eq!(ball.position(), Point2D::new(320.0, 240.0));
    }

    #[test]
    fn collision_is_strict_on_the_summed_radii() {
        let ball = still_ball(ShapeKind::Circle, Point2D::new(100.0, 100.0));
        assert!(ball.collides_with(Point2D::new(219.0, 100.0), 70.0));
        assert!(!ball.collides_with(Point2D::new(220.0, 100.0), 70.0));
    }
}
