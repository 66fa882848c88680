//! FILENAME: engine/src/streamline.rs
//! PURPOSE: Streamline tracing with fixed-step fourth-order Runge-Kutta.
//! CONTEXT: A streamline solves dX/dt = F(X) from a seed. Each branch
//! stops when it has produced its vertex budget, steps out of the bounding
//! box, reaches a point where |F| is below the stagnation threshold, or
//! meets a non-finite value.
//!
//! BUDGET: `max_steps` counts vertices, seed included. A two-way line gives
//! each branch (max_steps + 1) / 2 vertices, so the merged line never
//! exceeds max_steps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::field::CompiledField;
use crate::grid::{linspace, validate_point, Domain, Point, Vector3};
use crate::limits::EngineLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    #[default]
    Both,
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            "both" => Ok(Direction::Both),
            other => Err(ValidationError::parameter(
                "direction",
                format!("expected forward, backward or both, got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
            Direction::Both => write!(f, "both"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamlineOptions {
    /// Step magnitude; the sign is taken from `direction`.
    pub h: f64,
    /// Vertex budget, seed included.
    pub max_steps: usize,
    pub bbox: Domain,
    pub min_speed: f64,
    pub direction: Direction,
}

impl Default for StreamlineOptions {
    fn default() -> Self {
        StreamlineOptions::from_limits(&EngineLimits::default())
    }
}

impl StreamlineOptions {
    /// Options built from the configured defaults.
    pub fn from_limits(limits: &EngineLimits) -> Self {
        StreamlineOptions {
            h: limits.default_step,
            max_steps: limits.default_max_steps,
            bbox: limits.default_bbox,
            min_speed: limits.default_min_speed,
            direction: Direction::Both,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.h.is_finite() || self.h == 0.0 {
            return Err(ValidationError::parameter(
                "h",
                format!("must be a finite non-zero number, got {}", self.h),
            ));
        }
        if !self.min_speed.is_finite() || self.min_speed < 0.0 {
            return Err(ValidationError::parameter(
                "minSpeed",
                format!("must be a finite non-negative number, got {}", self.min_speed),
            ));
        }
        if self.max_steps == 0 {
            return Err(ValidationError::parameter("maxSteps", "must be at least 1"));
        }
        self.bbox.validate()
    }
}

/// One traced line. `speeds[i]` is |F(points[i])|.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streamline {
    pub points: Vec<Point>,
    pub speeds: Vec<f64>,
    pub seed_index: usize,
}

impl Streamline {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Lines for a batch of seeds, as parallel arrays in seed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamlineBatch {
    pub lines: Vec<Vec<Point>>,
    pub speeds: Vec<Vec<f64>>,
    pub seed_indices: Vec<usize>,
}

impl StreamlineBatch {
    fn push(&mut self, line: Streamline) {
        self.lines.push(line.points);
        self.speeds.push(line.speeds);
        self.seed_indices.push(line.seed_index);
    }
}

/// One classical RK4 step of size `h` from `p`.
pub fn rk4_step(field: &CompiledField, p: &Point, h: f64) -> Point {
    let offset = |k: &Vector3, scale: f64| [p[0] + scale * k[0], p[1] + scale * k[1], p[2] + scale * k[2]];

    let k1 = field.evaluate(p);
    let k2 = field.evaluate(&offset(&k1, h / 2.0));
    let k3 = field.evaluate(&offset(&k2, h / 2.0));
    let k4 = field.evaluate(&offset(&k3, h));

    let mut next = *p;
    for i in 0..3 {
        next[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
    next
}

/// Traces one branch from `seed` with signed step `h`, producing at most
/// `budget` vertices (the seed is vertex 0).
fn trace(
    field: &CompiledField,
    seed: &Point,
    h: f64,
    budget: usize,
    bbox: &Domain,
    min_speed: f64,
) -> (Vec<Point>, Vec<f64>) {
    let mut points = vec![*seed];
    let mut speeds = vec![field.speed(seed)];

    if !bbox.contains(seed) {
        return (points, speeds);
    }

    while points.len() < budget {
        let (current, speed) = match (points.last(), speeds.last()) {
            (Some(p), Some(s)) => (*p, *s),
            _ => break,
        };
        // Stagnant or undefined here: do not step further
        if !speed.is_finite() || speed < min_speed {
            break;
        }

        let next = rk4_step(field, &current, h);
        if !next.iter().all(|c| c.is_finite()) || !bbox.contains(&next) {
            break;
        }
        let next_speed = field.speed(&next);
        if !next_speed.is_finite() {
            break;
        }
        points.push(next);
        speeds.push(next_speed);
    }

    (points, speeds)
}

/// Traces a streamline through `seed`.
pub fn integrate(
    field: &CompiledField,
    seed: &Point,
    options: &StreamlineOptions,
) -> Result<Streamline, ValidationError> {
    options.validate()?;
    let seed = validate_point(seed)?;
    let bbox = options.bbox.ordered();
    let step = options.h.abs();

    let line = match options.direction {
        Direction::Forward | Direction::Backward => {
            let h = if options.direction == Direction::Forward { step } else { -step };
            let (points, speeds) = trace(field, &seed, h, options.max_steps, &bbox, options.min_speed);
            Streamline {
                points,
                speeds,
                seed_index: 0,
            }
        }
        Direction::Both => {
            let budget = ((options.max_steps + 1) / 2).max(1);
            let (mut points, mut speeds) =
                trace(field, &seed, -step, budget, &bbox, options.min_speed);
            let (forward_points, forward_speeds) =
                trace(field, &seed, step, budget, &bbox, options.min_speed);

            // Backward branch reversed ends at the seed; append forward minus its seed
            points.reverse();
            speeds.reverse();
            let seed_index = points.len() - 1;
            points.extend(forward_points.into_iter().skip(1));
            speeds.extend(forward_speeds.into_iter().skip(1));
            Streamline {
                points,
                speeds,
                seed_index,
            }
        }
    };

    Ok(line)
}

/// Traces every seed independently, in order.
///
/// `options.max_steps` is clamped to the configured maximum; more than
/// `limits.max_seeds` seeds is an error.
pub fn integrate_batch(
    field: &CompiledField,
    seeds: &[Point],
    options: &StreamlineOptions,
    limits: &EngineLimits,
) -> Result<StreamlineBatch, ValidationError> {
    if seeds.len() > limits.max_seeds {
        return Err(ValidationError::TooManySeeds {
            count: seeds.len(),
            max: limits.max_seeds,
        });
    }

    let options = StreamlineOptions {
        max_steps: limits.clamp_steps(options.max_steps),
        ..*options
    };

    let mut batch = StreamlineBatch::default();
    for seed in seeds {
        batch.push(integrate(field, seed, &options)?);
    }

    log::debug!(
        "[STREAMLINE] traced {} line(s) for '{}' ({} vertices, direction {})",
        batch.lines.len(),
        field.expression(),
        batch.lines.iter().map(Vec::len).sum::<usize>(),
        options.direction
    );
    Ok(batch)
}

/// An `nx` x `ny` lattice of seeds on the mid-height plane of `domain`,
/// x varying fastest.
pub fn seed_plane(domain: &Domain, nx: usize, ny: usize) -> Vec<Point> {
    let domain = domain.ordered();
    let z = domain.center()[2];
    let xs = linspace(domain.x[0], domain.x[1], nx);
    let ys = linspace(domain.y[0], domain.y[1], ny);

    ys.iter()
        .flat_map(|&y| xs.iter().map(move |&x| [x, y, z]))
        .collect()
}
