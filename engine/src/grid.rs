//! FILENAME: engine/src/grid.rs
//! PURPOSE: Points, domains, resolutions and the regular sampling lattice.
//! CONTEXT: Grid requests arrive as a domain (three closed intervals) plus a
//! resolution (samples per axis). This module validates both and expands
//! them into an ordered point list with x varying fastest, then y, then z.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A location in space (x, y, z).
pub type Point = [f64; 3];

/// A field value or operator result (P, Q, R).
pub type Vector3 = [f64; 3];

/// Euclidean length of a vector.
pub fn norm(v: &Vector3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Checks that `values` holds exactly three finite numbers.
pub fn validate_point(values: &[f64]) -> Result<Point, ValidationError> {
    let point: Point = values
        .try_into()
        .map_err(|_| ValidationError::Point { len: values.len() })?;
    if point.iter().all(|c| c.is_finite()) {
        Ok(point)
    } else {
        Err(ValidationError::NonFinitePoint)
    }
}

/// Axis-aligned region: three closed intervals [min, max].
/// Also used as the bounding box for streamline integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub z: [f64; 2],
}

impl Domain {
    pub fn new(x: [f64; 2], y: [f64; 2], z: [f64; 2]) -> Self {
        Domain { x, y, z }
    }

    /// The cube [min, max]^3.
    pub fn cube(min: f64, max: f64) -> Self {
        Domain::new([min, max], [min, max], [min, max])
    }

    pub fn axes(&self) -> [(&'static str, [f64; 2]); 3] {
        [("x", self.x), ("y", self.y), ("z", self.z)]
    }

    /// Every bound must be a finite number.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (axis, [lo, hi]) in self.axes() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(ValidationError::Domain {
                    axis,
                    reason: format!("bounds must be finite, got [{}, {}]", lo, hi),
                });
            }
        }
        Ok(())
    }

    /// Same region with each interval's bounds swapped into min <= max.
    pub fn ordered(&self) -> Self {
        let order = |[a, b]: [f64; 2]| if a <= b { [a, b] } else { [b, a] };
        Domain::new(order(self.x), order(self.y), order(self.z))
    }

    /// Inclusive containment test. Assumes ordered bounds.
    pub fn contains(&self, p: &Point) -> bool {
        self.axes()
            .iter()
            .zip(p.iter())
            .all(|((_, [lo, hi]), c)| *lo <= *c && *c <= *hi)
    }

    pub fn center(&self) -> Point {
        [
            (self.x[0] + self.x[1]) / 2.0,
            (self.y[0] + self.y[1]) / 2.0,
            (self.z[0] + self.z[1]) / 2.0,
        ]
    }
}

/// Samples per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl Resolution {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Resolution { nx, ny, nz }
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    /// Validates the resolution and returns nx*ny*nz.
    /// Each count must be positive and the product must not exceed `max_points`.
    pub fn validate(&self, max_points: usize) -> Result<usize, ValidationError> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(ValidationError::TooManyPoints {
                count: 0,
                max: max_points,
            });
        }
        let count = self
            .nx
            .checked_mul(self.ny)
            .and_then(|n| n.checked_mul(self.nz))
            .ok_or_else(|| {
                ValidationError::Resolution(format!(
                    "{} x {} x {} overflows",
                    self.nx, self.ny, self.nz
                ))
            })?;
        if count > max_points {
            return Err(ValidationError::TooManyPoints {
                count,
                max: max_points,
            });
        }
        Ok(count)
    }
}

/// A regular lattice of sample points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub points: Vec<Point>,
    pub shape: [usize; 3],
}

/// `n` evenly spaced samples from `min` to `max` inclusive.
/// `n == 1` degenerates to `[min]`; `n == 0` is empty.
pub fn linspace(min: f64, max: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let t = i as f64 / last;
                    min * (1.0 - t) + max * t
                })
                .collect()
        }
    }
}

/// Expands a domain and resolution into grid points, x fastest-varying.
/// Does not validate; callers run `Domain::validate` / `Resolution::validate` first.
pub fn build_grid(domain: &Domain, resolution: &Resolution) -> Grid {
    let xs = linspace(domain.x[0], domain.x[1], resolution.nx);
    let ys = linspace(domain.y[0], domain.y[1], resolution.ny);
    let zs = linspace(domain.z[0], domain.z[1], resolution.nz);

    let mut points = Vec::with_capacity(xs.len() * ys.len() * zs.len());
    for &z in &zs {
        for &y in &ys {
            for &x in &xs {
                points.push([x, y, z]);
            }
        }
    }

    Grid {
        points,
        shape: resolution.shape(),
    }
}
