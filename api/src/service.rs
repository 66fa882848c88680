//! FILENAME: api/src/service.rs
//! PURPOSE: The field service: request validation and engine calls.
//! CONTEXT: Each operation takes a typed request, resolves the field through
//! the service's cache, checks every client-supplied number against the
//! configured limits, and returns a serializable response. `dispatch` adds a
//! command-name router over raw JSON for transports that carry untyped
//! payloads (HTTP routes, IPC messages).

use std::sync::Arc;

use field_engine::{
    build_grid, curl_batch, divergence_batch, integrate_batch, line_integral, seed_plane,
    validate_point, CompiledField, DiffMethod, Direction, Domain, EngineLimits, FieldCache,
    LineIntegral, OperatorOptions, ParametricCurve, Point, Resolution, StreamlineBatch,
    StreamlineOptions, ValidationError,
};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::types::{
    BuildGridRequest, CompileRequest, CompileResponse, CurlResponse, DivergenceResponse,
    DomainInput, EvaluateGridRequest, EvaluateRequest, EvaluateResponse, GridResponse,
    GridValuesResponse, HealthResponse, LineIntegralRequest, OperatorRequest, ResolutionInput,
    SampleInput, StreamlineRequest,
};

/// Process-wide service for hosts that do not manage their own instance.
static GLOBAL: Lazy<FieldService> = Lazy::new(FieldService::new);

/// Command names accepted by `FieldService::dispatch`.
pub const COMMANDS: [&str; 9] = [
    "compile",
    "evaluate",
    "evaluate-grid",
    "div",
    "curl",
    "grid",
    "streamlines",
    "line-integral",
    "health",
];

#[derive(Debug)]
pub struct FieldService {
    cache: FieldCache,
    limits: EngineLimits,
}

impl Default for FieldService {
    fn default() -> Self {
        FieldService::new()
    }
}

/// Sample points plus the lattice shape when they came from a grid.
struct Samples {
    points: Vec<Point>,
    shape: Option<[usize; 3]>,
}

impl FieldService {
    pub fn new() -> Self {
        FieldService::with_limits(EngineLimits::default())
    }

    pub fn with_limits(limits: EngineLimits) -> Self {
        FieldService {
            cache: FieldCache::with_capacity(limits.cache_capacity),
            limits,
        }
    }

    pub fn global() -> &'static FieldService {
        &GLOBAL
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    pub fn cache(&self) -> &FieldCache {
        &self.cache
    }

    fn field(&self, expression: &str) -> ApiResult<Arc<CompiledField>> {
        Ok(self.cache.get_or_compile(expression)?)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    pub fn compile(&self, request: &CompileRequest) -> ApiResult<CompileResponse> {
        let field = self.field(&request.field)?;
        let [p, q, r] = field.components();
        Ok(CompileResponse {
            normalized: field.expression().to_string(),
            components: [p.to_string(), q.to_string(), r.to_string()],
        })
    }

    pub fn evaluate(&self, request: &EvaluateRequest) -> ApiResult<EvaluateResponse> {
        let field = self.field(&request.field)?;
        Ok(EvaluateResponse {
            value: field.evaluate_checked(&request.point)?,
        })
    }

    pub fn evaluate_grid(&self, request: &EvaluateGridRequest) -> ApiResult<GridValuesResponse> {
        let field = self.field(&request.field)?;
        let samples = self.samples(&request.sample)?;
        let values = field.evaluate_many(&samples.points);
        Ok(GridValuesResponse {
            points: samples.points,
            values,
            shape: samples.shape,
        })
    }

    pub fn build_grid(&self, request: &BuildGridRequest) -> ApiResult<GridResponse> {
        let domain = resolve_domain(&request.domain)?;
        let resolution = self.resolve_resolution(&request.resolution)?;
        let grid = build_grid(&domain, &resolution);
        Ok(GridResponse {
            points: grid.points,
            shape: grid.shape,
        })
    }

    pub fn divergence(&self, request: &OperatorRequest) -> ApiResult<DivergenceResponse> {
        let field = self.field(&request.field)?;
        let options = self.operator_options(request)?;

        if let Some(point) = &request.point {
            let point = validate_point(point)?;
            let values = divergence_batch(&field, &[point], &options)?;
            return Ok(DivergenceResponse {
                value: values.first().copied(),
                points: None,
                values: None,
                shape: None,
            });
        }

        let samples = self.samples(&request.sample)?;
        let values = divergence_batch(&field, &samples.points, &options)?;
        Ok(DivergenceResponse {
            value: None,
            points: Some(samples.points),
            values: Some(values),
            shape: samples.shape,
        })
    }

    pub fn curl(&self, request: &OperatorRequest) -> ApiResult<CurlResponse> {
        let field = self.field(&request.field)?;
        let options = self.operator_options(request)?;

        if let Some(point) = &request.point {
            let point = validate_point(point)?;
            let values = curl_batch(&field, &[point], &options)?;
            return Ok(CurlResponse {
                value: values.first().copied(),
                points: None,
                values: None,
                shape: None,
            });
        }

        let samples = self.samples(&request.sample)?;
        let values = curl_batch(&field, &samples.points, &options)?;
        Ok(CurlResponse {
            value: None,
            points: Some(samples.points),
            values: Some(values),
            shape: samples.shape,
        })
    }

    pub fn streamlines(&self, request: &StreamlineRequest) -> ApiResult<StreamlineBatch> {
        let field = self.field(&request.field)?;
        let defaults = StreamlineOptions::from_limits(&self.limits);

        let bbox = match &request.bbox {
            Some(input) => resolve_domain(input)?,
            None => defaults.bbox,
        };
        let direction = match (&request.direction, request.bidirectional) {
            (Some(text), _) => text.parse::<Direction>()?,
            (None, Some(true)) => Direction::Both,
            (None, Some(false)) => Direction::Forward,
            (None, None) => Direction::Both,
        };
        let options = StreamlineOptions {
            h: request.h.unwrap_or(defaults.h),
            max_steps: match request.max_steps {
                Some(n) => usize::try_from(n).unwrap_or(0),
                None => defaults.max_steps,
            },
            bbox,
            min_speed: request.min_speed.unwrap_or(defaults.min_speed),
            direction,
        };

        let seeds = self.seeds(request, &bbox)?;
        Ok(integrate_batch(&field, &seeds, &options, &self.limits)?)
    }

    pub fn line_integral(&self, request: &LineIntegralRequest) -> ApiResult<LineIntegral> {
        let field = self.field(&request.field)?;
        let curve = ParametricCurve::compile(&request.curve.expression())?;

        let t_range: [f64; 2] = request.t_range.as_slice().try_into().map_err(|_| {
            ValidationError::parameter(
                "tRange",
                format!("expected [t0, t1], got {} value(s)", request.t_range.len()),
            )
        })?;
        let steps = match request.steps {
            Some(n) => usize::try_from(n).unwrap_or(0),
            None => self.limits.default_line_steps,
        };

        Ok(line_integral(&field, &curve, t_range, steps, &self.limits)?)
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            cached_fields: self.cache.len(),
            cache_capacity: self.cache.capacity(),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Runs `command` with a JSON payload and returns the JSON response.
    pub fn dispatch(&self, command: &str, payload: Value) -> ApiResult<Value> {
        let result = self.route(command, payload);
        if let Err(e) = &result {
            log::info!("[API] {} rejected ({}): {}", command, e.kind(), e);
        }
        result
    }

    fn route(&self, command: &str, payload: Value) -> ApiResult<Value> {
        match command {
            "compile" => respond(self.compile(&request(payload)?)),
            "evaluate" => respond(self.evaluate(&request(payload)?)),
            "evaluate-grid" => respond(self.evaluate_grid(&request(payload)?)),
            "div" => respond(self.divergence(&request(payload)?)),
            "curl" => respond(self.curl(&request(payload)?)),
            "grid" => respond(self.build_grid(&request(payload)?)),
            "streamlines" => {
                let batch = self.streamlines(&request(payload)?)?;
                let mut body = serde_json::to_value(batch)?;
                body["status"] = json!("ok");
                Ok(body)
            }
            "line-integral" => respond(self.line_integral(&request(payload)?)),
            "health" => respond(Ok(self.health())),
            other => Err(ApiError::UnknownCommand(other.to_string())),
        }
    }

    // ========================================================================
    // Input resolution
    // ========================================================================

    fn operator_options(&self, request: &OperatorRequest) -> ApiResult<OperatorOptions> {
        let method = match &request.method {
            Some(text) => text.parse::<DiffMethod>()?,
            None => DiffMethod::Auto,
        };
        let options = OperatorOptions::new(method, request.h.unwrap_or(self.limits.default_fd_step));
        options.validate()?;
        Ok(options)
    }

    fn resolve_resolution(&self, input: &ResolutionInput) -> Result<Resolution, ValidationError> {
        let count = |name: &str, n: i64| {
            usize::try_from(n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ValidationError::Resolution(format!("{} must be a positive integer, got {}", name, n))
                })
        };
        let resolution = Resolution::new(
            count("nx", input.nx)?,
            count("ny", input.ny)?,
            count("nz", input.nz)?,
        );
        resolution.validate(self.limits.max_grid_points)?;
        Ok(resolution)
    }

    fn samples(&self, input: &SampleInput) -> Result<Samples, ValidationError> {
        if let Some(points) = &input.points {
            if points.is_empty() || points.len() > self.limits.max_grid_points {
                return Err(ValidationError::TooManyPoints {
                    count: points.len(),
                    max: self.limits.max_grid_points,
                });
            }
            let points = points
                .iter()
                .map(|p| validate_point(p))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Samples { points, shape: None });
        }

        match (&input.domain, &input.resolution) {
            (Some(domain), Some(resolution)) => {
                let domain = resolve_domain(domain)?;
                let resolution = self.resolve_resolution(resolution)?;
                let grid = build_grid(&domain, &resolution);
                Ok(Samples {
                    points: grid.points,
                    shape: Some(grid.shape),
                })
            }
            _ => Err(ValidationError::MissingInput(
                "\"points\" or \"domain\" and \"resolution\"",
            )),
        }
    }

    fn seeds(&self, request: &StreamlineRequest, bbox: &Domain) -> Result<Vec<Point>, ValidationError> {
        if let Some(seeds) = request.seeds.as_ref().filter(|s| !s.is_empty()) {
            // Count first so an oversized list is rejected before any parsing
            if seeds.len() > self.limits.max_seeds {
                return Err(ValidationError::TooManySeeds {
                    count: seeds.len(),
                    max: self.limits.max_seeds,
                });
            }
            return seeds.iter().map(|s| validate_point(s)).collect();
        }

        if let Some(grid) = request.seed_grid {
            let nx = usize::try_from(grid.nx).unwrap_or(0);
            let ny = usize::try_from(grid.ny).unwrap_or(0);
            if nx == 0 || ny == 0 {
                return Err(ValidationError::parameter(
                    "seedGrid",
                    format!("nx and ny must be positive, got {} x {}", grid.nx, grid.ny),
                ));
            }
            let count = nx.saturating_mul(ny);
            if count > self.limits.max_seeds {
                return Err(ValidationError::TooManySeeds {
                    count,
                    max: self.limits.max_seeds,
                });
            }
            return Ok(seed_plane(bbox, nx, ny));
        }

        Ok(vec![[0.0, 0.0, 0.0]])
    }
}

/// Checks three two-element finite intervals and orders each one.
fn resolve_domain(input: &DomainInput) -> Result<Domain, ValidationError> {
    let interval = |axis: &'static str, values: &[f64]| -> Result<[f64; 2], ValidationError> {
        values.try_into().map_err(|_| ValidationError::Domain {
            axis,
            reason: format!("expected [min, max], got {} value(s)", values.len()),
        })
    };
    let domain = Domain::new(
        interval("x", input.x.as_slice())?,
        interval("y", input.y.as_slice())?,
        interval("z", input.z.as_slice())?,
    );
    domain.validate()?;
    Ok(domain.ordered())
}

fn request<T: DeserializeOwned>(payload: Value) -> ApiResult<T> {
    Ok(serde_json::from_value(payload)?)
}

fn respond<T: Serialize>(result: ApiResult<T>) -> ApiResult<Value> {
    Ok(serde_json::to_value(result?)?)
}
