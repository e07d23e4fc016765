// THEORY:
// The `ParticleFilter` is the state estimator at the heart of the tracker. It turns
// a stream of noisy, often missing, detections into a smooth and physically
// plausible ball position by keeping an ensemble of weighted guesses ("particles")
// about where the ball is and how fast it moves.
//
// Each frame runs the classic predict / correct cycle:
// 1.  **Prediction**: every particle moves by its own velocity plus Gaussian noise,
//     and its velocity takes a random kick. This is a constant-velocity model with
//     stochastic acceleration.
// 2.  **Containment**: positions are clamped into the canvas and the velocity of a
//     particle that lands exactly on an edge is reversed, like an elastic bounce.
// 3.  **Correction** (only with a measurement): particles are weighted by a
//     Gaussian kernel on their distance to the measurement. When the weights
//     concentrate on too few particles (effective sample size below N / 2), the
//     ensemble is redrawn in proportion to the weights and the copies get fresh
//     velocity noise so they do not collapse onto identical states.
//
// A missing measurement is a normal input: the ensemble simply keeps evolving on
// the motion model and spreads out until the marker is seen again.
//
// The position estimate is the *unweighted* mean of the ensemble. Weights only
// steer resampling.
//
// Randomness comes from an owned, injectable `Rng` so runs can be replayed
// deterministically from a seed.

use crate::core_modules::particle::Particle;
use crate::core_modules::point::{Canvas, Point2D};
use crate::error::{Error, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// Tunable parameters of the particle filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Ensemble size N.
    pub num_particles: usize,
    /// Width of the Gaussian measurement kernel, in pixels.
    pub kernel_sigma: f64,
    /// Position noise added during prediction by [`ParticleFilter::update_default`].
    pub motion_noise_std: f64,
    /// Velocity noise added during prediction and resampling by
    /// [`ParticleFilter::update_default`].
    pub accel_noise_std: f64,
    /// Spread of the initial positions around the starting point.
    pub initial_position_std: f64,
    /// Spread of the initial velocities around zero.
    pub initial_velocity_std: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            num_particles: 300,
            kernel_sigma: 50.0,
            motion_noise_std: 10.0,
            accel_noise_std: 2.0,
            initial_position_std: 20.0,
            initial_velocity_std: 5.0,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_particles == 0 {
            return Err(Error::EmptyEnsemble);
        }
        if !(self.kernel_sigma.is_finite() && self.kernel_sigma > 0.0) {
            return Err(Error::InvalidSigma(self.kernel_sigma));
        }
        for (name, value) in [
            ("motion_noise_std", self.motion_noise_std),
            ("accel_noise_std", self.accel_noise_std),
            ("initial_position_std", self.initial_position_std),
            ("initial_velocity_std", self.initial_velocity_std),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidNoise { name, value });
            }
        }
        Ok(())
    }
}

/// Zero-mean Gaussian noise with standard deviation `std`.
fn gaussian<R: Rng + ?Sized>(rng: &mut R, std: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    std * z
}

/// Negative or non-finite noise is treated as no noise.
fn sanitize_noise(name: &'static str, std: f64) -> f64 {
    if std.is_finite() && std >= 0.0 {
        std
    } else {
        warn!(name, std, "invalid noise standard deviation, using 0");
        0.0
    }
}

/// A sequential Monte Carlo estimator of a 2D position and velocity.
pub struct ParticleFilter<R: Rng = StdRng> {
    particles: Vec<Particle>,
    /// Pre-allocated destination for resampling, swapped with `particles`.
    scratch: Vec<Particle>,
    weights: Vec<f64>,
    canvas: Canvas,
    config: FilterConfig,
    last_effective_size: Option<f64>,
    rng: R,
}

impl ParticleFilter<StdRng> {
    /// Scatters a fresh ensemble around `initial`, seeded from OS entropy.
    pub fn new(initial: Point2D, config: FilterConfig, canvas: Canvas) -> Result<Self> {
        Self::with_rng(initial, config, canvas, StdRng::from_entropy())
    }
}

impl<R: Rng> ParticleFilter<R> {
    /// Scatters a fresh ensemble around `initial` using the given random source.
    ///
    /// Positions are Gaussian around `initial` with `initial_position_std`,
    /// velocities are zero-mean Gaussian with `initial_velocity_std`.
    pub fn with_rng(initial: Point2D, config: FilterConfig, canvas: Canvas, mut rng: R) -> Result<Self> {
        config.validate()?;
        let particles: Vec<Particle> = (0..config.num_particles)
            .map(|_| {
                Particle::new(
                    initial.x + gaussian(&mut rng, config.initial_position_std),
                    initial.y + gaussian(&mut rng, config.initial_position_std),
                    gaussian(&mut rng, config.initial_velocity_std),
                    gaussian(&mut rng, config.initial_velocity_std),
                )
            })
            .collect();
        info!(
            x = initial.x,
            y = initial.y,
            particles = config.num_particles,
            "particle filter initialised"
        );
        Self::from_particles(particles, config, canvas, rng)
    }

    /// Builds a filter around an explicit ensemble. `config.num_particles` is
    /// replaced by the ensemble's length.
    pub fn from_particles(
        particles: Vec<Particle>,
        mut config: FilterConfig,
        canvas: Canvas,
        rng: R,
    ) -> Result<Self> {
        if particles.is_empty() {
            return Err(Error::EmptyEnsemble);
        }
        config.num_particles = particles.len();
        config.validate()?;
        let canvas = Canvas::new(canvas.width, canvas.height)?;

        let n = particles.len();
        Ok(Self {
            scratch: particles.clone(),
            particles,
            weights: vec![1.0 / n as f64; n],
            canvas,
            config,
            last_effective_size: None,
            rng,
        })
    }

    /// Advances the ensemble by one frame and, if a measurement is present,
    /// corrects it.
    pub fn update(&mut self, measurement: Option<Point2D>, motion_noise_std: f64, accel_noise_std: f64) {
        let motion_noise_std = sanitize_noise("motion_noise_std", motion_noise_std);
        let accel_noise_std = sanitize_noise("accel_noise_std", accel_noise_std);

        // --- 1. Prediction & Containment ---
        for particle in self.particles.iter_mut() {
            particle.x += particle.vx + gaussian(&mut self.rng, motion_noise_std);
            particle.y += particle.vy + gaussian(&mut self.rng, motion_noise_std);
            particle.vx += gaussian(&mut self.rng, accel_noise_std);
            particle.vy += gaussian(&mut self.rng, accel_noise_std);
            particle.bounce_within(&self.canvas);
        }

        // --- 2. Correction ---
        let Some(measurement) = measurement else {
            self.last_effective_size = None;
            return;
        };

        let effective_size = self.weigh(&measurement);
        self.last_effective_size = Some(effective_size);

        let n = self.particles.len() as f64;
        if effective_size < n / 2.0 {
            debug!(effective_size, "resampling particle ensemble");
            self.resample(accel_noise_std);
        } else {
            trace!(effective_size, "ensemble diverse enough, skipping resampling");
        }
    }

    /// [`ParticleFilter::update`] with the noise levels from the configuration.
    pub fn update_default(&mut self, measurement: Option<Point2D>) {
        let (motion, accel) = (self.config.motion_noise_std, self.config.accel_noise_std);
        self.update(measurement, motion, accel);
    }

    /// Assigns normalized Gaussian-kernel weights and returns the effective
    /// sample size `1 / sum(w^2)`.
    fn weigh(&mut self, measurement: &Point2D) -> f64 {
        let two_sigma_squared = 2.0 * self.config.kernel_sigma.powi(2);
        for (weight, particle) in self.weights.iter_mut().zip(&self.particles) {
            *weight = (-particle.position().distance_squared(measurement) / two_sigma_squared).exp();
        }

        let total: f64 = self.weights.iter().sum();
        if total > 0.0 {
            for weight in self.weights.iter_mut() {
                *weight /= total;
            }
        } else {
            trace!("all particle weights vanished, falling back to uniform");
            let uniform = 1.0 / self.weights.len() as f64;
            self.weights.fill(uniform);
        }

        1.0 / self.weights.iter().map(|w| w * w).sum::<f64>()
    }

    /// Multinomial resampling in proportion to the current weights, followed by
    /// fresh velocity noise.
    fn resample(&mut self, accel_noise_std: f64) {
        let distribution = match WeightedIndex::new(&self.weights) {
            Ok(distribution) => distribution,
            Err(error) => {
                warn!(%error, "cannot resample from particle weights");
                return;
            }
        };

        for slot in self.scratch.iter_mut() {
            let mut particle = self.particles[distribution.sample(&mut self.rng)];
            particle.vx += gaussian(&mut self.rng, accel_noise_std);
            particle.vy += gaussian(&mut self.rng, accel_noise_std);
            *slot = particle;
        }
        std::mem::swap(&mut self.particles, &mut self.scratch);
    }

    /// The unweighted mean of all particle positions.
    pub fn get_position(&self) -> Point2D {
        let n = self.particles.len() as f64;
        let (sum_x, sum_y) = self
            .particles
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2D::new(sum_x / n, sum_y / n)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Effective sample size computed during the last update, if it had a
    /// measurement.
    pub fn effective_sample_size(&self) -> Option<f64> {
        self.last_effective_size
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}
