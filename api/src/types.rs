//! FILENAME: api/src/types.rs
// PURPOSE: Request and response shapes for the field service.
// CONTEXT: All structs use camelCase serialization for JavaScript interoperability.
// Numeric inputs that need range checks (intervals, counts) are taken loosely
// here and validated by the service, so a bad value is reported by name
// instead of as a generic payload error.

use serde::{Deserialize, Serialize};

use field_engine::{Point, Vector3};

// ============================================================================
// Shared inputs
// ============================================================================

/// Three intervals as sent by clients: `{"x": [-1, 1], "y": [...], "z": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainInput {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl DomainInput {
    pub fn cube(min: f64, max: f64) -> Self {
        DomainInput {
            x: vec![min, max],
            y: vec![min, max],
            z: vec![min, max],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionInput {
    pub nx: i64,
    pub ny: i64,
    pub nz: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedGridInput {
    pub nx: i64,
    pub ny: i64,
}

/// Where to sample: an explicit point list, or a domain plus resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleInput {
    #[serde(default)]
    pub points: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub domain: Option<DomainInput>,
    #[serde(default)]
    pub resolution: Option<ResolutionInput>,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    pub field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub field: String,
    pub point: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateGridRequest {
    pub field: String,
    #[serde(flatten)]
    pub sample: SampleInput,
}

/// Divergence or curl at one point, a point list, or a grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRequest {
    pub field: String,
    #[serde(default)]
    pub point: Option<Vec<f64>>,
    #[serde(flatten)]
    pub sample: SampleInput,
    /// "auto" (default), "symbolic" or "numeric"
    #[serde(default)]
    pub method: Option<String>,
    /// Finite-difference step for the numeric path
    #[serde(default)]
    pub h: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildGridRequest {
    pub domain: DomainInput,
    pub resolution: ResolutionInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamlineRequest {
    pub field: String,
    #[serde(default)]
    pub seeds: Option<Vec<Vec<f64>>>,
    /// Seeds on the mid-height plane of the bounding box
    #[serde(default)]
    pub seed_grid: Option<SeedGridInput>,
    #[serde(default)]
    pub h: Option<f64>,
    #[serde(default)]
    pub max_steps: Option<i64>,
    #[serde(default)]
    pub bbox: Option<DomainInput>,
    #[serde(default)]
    pub min_speed: Option<f64>,
    /// "forward", "backward" or "both"; takes precedence over `bidirectional`
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub bidirectional: Option<bool>,
}

/// A parametric curve, either as one "(x(t), y(t), z(t))" string or per component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveInput {
    Text(String),
    Components { x: String, y: String, z: String },
}

impl CurveInput {
    pub fn expression(&self) -> String {
        match self {
            CurveInput::Text(text) => text.clone(),
            CurveInput::Components { x, y, z } => format!("({}, {}, {})", x, y, z),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineIntegralRequest {
    pub field: String,
    pub curve: CurveInput,
    pub t_range: Vec<f64>,
    #[serde(default)]
    pub steps: Option<i64>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    /// The cache key the field is stored under.
    pub normalized: String,
    /// P, Q and R rendered back to text.
    pub components: [String; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub value: Vector3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridValuesResponse {
    pub points: Vec<Point>,
    pub values: Vec<Vector3>,
    /// Present when the points came from a domain and resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<[usize; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResponse {
    pub points: Vec<Point>,
    pub shape: [usize; 3],
}

/// `value` for a single point, otherwise `points` and `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<[usize; 3]>,
}

pub type DivergenceResponse = OperatorResponse<f64>;
pub type CurlResponse = OperatorResponse<Vector3>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub cached_fields: usize,
    pub cache_capacity: usize,
}
