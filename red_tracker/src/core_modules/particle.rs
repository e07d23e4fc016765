// THEORY:
// A `Particle` is one guess at where the ball is and how fast it is moving. The
// filter owns hundreds of them and never tracks any single one; they are copied,
// overwritten and nudged freely. The only rule a particle enforces on itself is
// that it stays on the canvas, bouncing off the edges like the ball on screen.

use crate::core_modules::point::{Canvas, Point2D};

/// A single hypothesis of the ball's state: position and velocity in pixels
/// (per frame for the velocity). Particles carry no identity; resampling copies
/// and replaces them freely.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Particle {
    pub const fn new(x: f64, y: f64, vx: f64, vy: f64) -> Self {
        Self { x, y, vx, vy }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Clamps the position into `canvas` and reverses the velocity component of
    /// any axis that ended up exactly on an edge.
    ///
    /// The inversion is decided after clamping, so a particle that merely comes
    /// close to an edge keeps its velocity.
    pub fn bounce_within(&mut self, canvas: &Canvas) {
        let max_x = canvas.max_x();
        let max_y = canvas.max_y();
        self.x = self.x.clamp(0.0, max_x);
        self.y = self.y.clamp(0.0, max_y);
        if self.x == 0.0 || self.x == max_x {
            self.vx = -self.vx;
        }
        if self.y == 0.0 || self.y == max_y {
            self.vy = -self.vy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_past_the_left_edge_bounces() {
        let canvas = Canvas::new(100, 50).expect("valid canvas");
        let mut particle = Particle::new(-3.0, 20.0, -2.0, 1.0);
        particle.bounce_within(&canvas);
        assert_eq!(particle, Particle::new(0.0, 20.0, 2.0, 1.0));
    }

    #[test]
    fn particle_past_the_bottom_right_corner_bounces_on_both_axes() {
        let canvas = Canvas::new(100, 50).expect("valid canvas");
        let mut particle = Particle::new(120.0, 60.0, 4.0, 3.0);
        particle.bounce_within(&canvas);
        assert_eq!(particle, Particle::new(99.0, 49.0, -4.0, -3.0));
    }

    #[test]
    fn particle_near_an_edge_keeps_its_velocity() {
        let canvas = Canvas::new(100, 50).expect("valid canvas");
        let mut particle = Particle::new(0.5, 48.9, -2.0, 1.0);
        particle.bounce_within(&canvas);
        assert_eq!(particle, Particle::new(0.5, 48.9, -2.0, 1.0));
    }
}
