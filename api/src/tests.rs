//! FILENAME: api/src/tests.rs
// PURPOSE: Request-level tests for the field service and its dispatcher.

#[cfg(test)]
use super::*;
use field_engine::{EngineError, EngineLimits, ValidationError};
use field_parser::GrammarError;
use serde_json::{json, Value};
use std::f64::consts::PI;

fn call(service: &FieldService, command: &str, payload: Value) -> Value {
    service.dispatch(command, payload).unwrap()
}

fn reject(service: &FieldService, command: &str, payload: Value) -> ApiError {
    service.dispatch(command, payload).unwrap_err()
}

fn as_f64s(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

// ============================================================================
// compile / evaluate
// ============================================================================

#[test]
fn test_compile_reports_normalized_components() {
    let service = FieldService::new();
    let body = call(&service, "compile", json!({ "field": " (-y, x^2, 2z) " }));
    assert_eq!(body["normalized"], "-y, x^2, 2z");
    assert_eq!(body["components"], json!(["-y", "x ^ 2", "2 * z"]));
}

#[test]
fn test_evaluate_identity_field() {
    let service = FieldService::new();
    let body = call(&service, "evaluate", json!({ "field": "(x,y,z)", "point": [1, 2, 3] }));
    assert_eq!(body["value"], json!([1.0, 2.0, 3.0]));
}

#[test]
fn test_evaluate_rejects_bad_points() {
    let service = FieldService::new();
    let err = reject(&service, "evaluate", json!({ "field": "(x,y,z)", "point": [1, 2] }));
    assert_eq!(err.kind(), "validation");
    assert!(matches!(
        err,
        ApiError::Engine(EngineError::Validation(ValidationError::Point { len: 2 }))
    ));
}

#[test]
fn test_non_finite_values_serialize_as_null() {
    let service = FieldService::new();
    let body = call(&service, "evaluate", json!({ "field": "(1/x, sqrt(y), 0)", "point": [0, -1, 0] }));
    assert_eq!(body["value"], json!([null, null, 0.0]));
}

// ============================================================================
// grammar errors
// ============================================================================

#[test]
fn test_grammar_errors_name_the_token() {
    let service = FieldService::new();

    let err = reject(&service, "evaluate", json!({ "field": "(foo, y, z)", "point": [0, 0, 0] }));
    assert_eq!(err.kind(), "grammar");
    assert_eq!(err.offending_token(), Some("foo"));
    assert_eq!(err.to_json()["token"], "foo");

    let err = reject(&service, "compile", json!({ "field": "(x = 1, y, z)" }));
    assert_eq!(err.kind(), "grammar");

    let err = reject(&service, "compile", json!({ "field": "(eval(x), y, z)" }));
    assert!(matches!(
        err,
        ApiError::Engine(EngineError::Grammar(GrammarError::DisallowedFunction(ref name))) if name == "eval"
    ));

    // Nothing is cached for rejected fields
    assert!(service.cache().is_empty());
}

#[test]
fn test_component_count() {
    let service = FieldService::new();
    let err = reject(&service, "compile", json!({ "field": "(x, y)" }));
    assert!(matches!(
        err,
        ApiError::Engine(EngineError::Grammar(GrammarError::ComponentCount(2)))
    ));
    assert_eq!(err.to_json()["kind"], "grammar");
}

// ============================================================================
// grids
// ============================================================================

#[test]
fn test_build_grid_cube() {
    let service = FieldService::new();
    let body = call(
        &service,
        "grid",
        json!({
            "domain": { "x": [-1, 1], "y": [-1, 1], "z": [-1, 1] },
            "resolution": { "nx": 3, "ny": 3, "nz": 3 }
        }),
    );
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 27);
    assert_eq!(body["shape"], json!([3, 3, 3]));
    assert_eq!(points[0], json!([-1.0, -1.0, -1.0]));
    assert_eq!(points[26], json!([1.0, 1.0, 1.0]));
}

#[test]
fn test_grid_swaps_reversed_bounds() {
    let service = FieldService::new();
    let body = call(
        &service,
        "grid",
        json!({
            "domain": { "x": [1, -1], "y": [0, 0], "z": [0, 0] },
            "resolution": { "nx": 2, "ny": 1, "nz": 1 }
        }),
    );
    assert_eq!(body["points"], json!([[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]));
}

#[test]
fn test_grid_validation_names_the_field() {
    let service = FieldService::new();

    let err = reject(
        &service,
        "grid",
        json!({
            "domain": { "x": [-1, 1], "y": [-1], "z": [-1, 1] },
            "resolution": { "nx": 3, "ny": 3, "nz": 3 }
        }),
    );
    assert!(err.to_string().contains("for y"));

    let err = reject(
        &service,
        "grid",
        json!({
            "domain": { "x": [-1, 1], "y": [-1, 1], "z": [-1, 1] },
            "resolution": { "nx": 0, "ny": 3, "nz": 3 }
        }),
    );
    assert!(err.to_string().contains("nx"));

    let err = reject(
        &service,
        "grid",
        json!({
            "domain": { "x": [-1, 1], "y": [-1, 1], "z": [-1, 1] },
            "resolution": { "nx": 100, "ny": 100, "nz": 4 }
        }),
    );
    assert!(matches!(
        err,
        ApiError::Engine(EngineError::Validation(ValidationError::TooManyPoints { count: 40_000, max: 30_000 }))
    ));
}

#[test]
fn test_evaluate_grid_agrees_with_pointwise_evaluate() {
    let service = FieldService::new();
    let field = "(sin(x) * y, z - x^2, exp(-y))";
    let body = call(
        &service,
        "evaluate-grid",
        json!({
            "field": field,
            "domain": { "x": [-1, 1], "y": [0, 2], "z": [-1, 1] },
            "resolution": { "nx": 3, "ny": 2, "nz": 2 }
        }),
    );
    assert_eq!(body["shape"], json!([3, 2, 2]));

    let points = body["points"].as_array().unwrap();
    let values = body["values"].as_array().unwrap();
    assert_eq!(points.len(), 12);
    for (point, value) in points.iter().zip(values.iter()) {
        let single = call(&service, "evaluate", json!({ "field": field, "point": point }));
        assert_eq!(&single["value"], value);
    }
}

#[test]
fn test_evaluate_grid_with_explicit_points() {
    let service = FieldService::new();
    let body = call(
        &service,
        "evaluate-grid",
        json!({ "field": "(x + y, 0, z)", "points": [[1, 2, 3], [0, 0, -1]] }),
    );
    assert_eq!(body["values"], json!([[3.0, 0.0, 3.0], [0.0, 0.0, -1.0]]));
    assert!(body.get("shape").is_none());

    let err = reject(&service, "evaluate-grid", json!({ "field": "(x, y, z)" }));
    assert!(matches!(
        err,
        ApiError::Engine(EngineError::Validation(ValidationError::MissingInput(_)))
    ));
}

#[test]
fn test_explicit_point_cap() {
    let limits = EngineLimits {
        max_grid_points: 2,
        ..EngineLimits::default()
    };
    let service = FieldService::with_limits(limits);
    let err = reject(
        &service,
        "evaluate-grid",
        json!({ "field": "(x, y, z)", "points": [[0, 0, 0], [1, 1, 1], [2, 2, 2]] }),
    );
    assert_eq!(err.kind(), "validation");
}

// ============================================================================
// divergence / curl
// ============================================================================

#[test]
fn test_divergence_symbolic_and_numeric() {
    let service = FieldService::new();
    let symbolic = call(
        &service,
        "div",
        json!({ "field": "(x, y, z)", "point": [0.3, -2, 5], "method": "symbolic" }),
    );
    assert_eq!(symbolic["value"], json!(3.0));

    let numeric = call(
        &service,
        "div",
        json!({ "field": "(x, y, z)", "point": [0.3, -2, 5], "method": "numeric", "h": 1e-3 }),
    );
    assert!((numeric["value"].as_f64().unwrap() - 3.0).abs() < 1e-6);
}

#[test]
fn test_curl_over_points() {
    let service = FieldService::new();
    let body = call(
        &service,
        "curl",
        json!({ "field": "(-y, x, 0)", "points": [[0, 0, 0], [1, 2, 3]], "method": "symbolic" }),
    );
    assert_eq!(body["values"], json!([[0.0, 0.0, 2.0], [0.0, 0.0, 2.0]]));
    assert!(body.get("value").is_none());
}

#[test]
fn test_divergence_over_grid_has_shape() {
    let service = FieldService::new();
    let body = call(
        &service,
        "div",
        json!({
            "field": "(x^2, 0, 0)",
            "domain": { "x": [0, 2], "y": [0, 0], "z": [0, 0] },
            "resolution": { "nx": 3, "ny": 1, "nz": 1 }
        }),
    );
    assert_eq!(body["shape"], json!([3, 1, 1]));
    assert_eq!(as_f64s(&body["values"]), vec![0.0, 2.0, 4.0]);
}

#[test]
fn test_symbolic_failure_is_reported_auto_is_not() {
    let service = FieldService::new();
    let err = reject(
        &service,
        "div",
        json!({ "field": "(max(x, y), y, z)", "point": [2, 1, 0], "method": "symbolic" }),
    );
    assert_eq!(err.kind(), "differentiation");

    let body = call(&service, "div", json!({ "field": "(max(x, y), y, z)", "point": [2, 1, 0] }));
    assert!((body["value"].as_f64().unwrap() - 3.0).abs() < 1e-6);
}

#[test]
fn test_operator_parameter_validation() {
    let service = FieldService::new();
    let err = reject(
        &service,
        "div",
        json!({ "field": "(x, y, z)", "point": [0, 0, 0], "method": "exact" }),
    );
    assert_eq!(err.kind(), "validation");

    let err = reject(
        &service,
        "curl",
        json!({ "field": "(x, y, z)", "point": [0, 0, 0], "h": -1 }),
    );
    assert!(err.to_string().contains("'h'"));
}

// ============================================================================
// streamlines
// ============================================================================

#[test]
fn test_streamlines_default_to_both_directions() {
    let service = FieldService::new();
    let body = call(
        &service,
        "streamlines",
        json!({ "field": "(-y, x, 0)", "seeds": [[1, 0, 0]], "maxSteps": 21 }),
    );
    assert_eq!(body["status"], "ok");
    assert_eq!(body["seedIndices"], json!([10]));

    let line = body["lines"][0].as_array().unwrap();
    assert_eq!(line.len(), 21);
    let seed = as_f64s(&line[10]);
    assert!((seed[0] - 1.0).abs() < 1e-12 && seed[1].abs() < 1e-12);
    assert_eq!(body["speeds"][0].as_array().unwrap().len(), 21);
}

#[test]
fn test_streamline_direction_options() {
    let service = FieldService::new();
    let forward = call(
        &service,
        "streamlines",
        json!({ "field": "(1, 0, 0)", "seeds": [[0, 0, 0]], "h": 0.5, "maxSteps": 3, "direction": "FORWARD" }),
    );
    assert_eq!(forward["lines"][0], json!([[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [1.0, 0.0, 0.0]]));

    // Legacy flag: bidirectional=false means forward
    let legacy = call(
        &service,
        "streamlines",
        json!({ "field": "(1, 0, 0)", "seeds": [[0, 0, 0]], "h": 0.5, "maxSteps": 3, "bidirectional": false }),
    );
    assert_eq!(legacy["lines"], forward["lines"]);

    // direction wins over bidirectional
    let backward = call(
        &service,
        "streamlines",
        json!({ "field": "(1, 0, 0)", "seeds": [[0, 0, 0]], "h": 0.5, "maxSteps": 2, "direction": "backward", "bidirectional": true }),
    );
    assert_eq!(backward["lines"][0], json!([[0.0, 0.0, 0.0], [-0.5, 0.0, 0.0]]));
}

#[test]
fn test_streamline_without_seeds_starts_at_origin() {
    let service = FieldService::new();
    let body = call(&service, "streamlines", json!({ "field": "(x, y, z)" }));
    assert_eq!(body["lines"], json!([[[0.0, 0.0, 0.0]]]));
    assert_eq!(body["seedIndices"], json!([0]));
}

#[test]
fn test_streamline_seed_grid_and_caps() {
    let service = FieldService::new();
    let body = call(
        &service,
        "streamlines",
        json!({
            "field": "(1, 0, 0)",
            "seedGrid": { "nx": 4, "ny": 5 },
            "bbox": { "x": [-1, 1], "y": [-1, 1], "z": [0, 2] },
            "maxSteps": 5000,
            "direction": "forward"
        }),
    );
    let lines = body["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 20);
    // Every seed sits on the z = 1 plane of the box
    assert!(lines.iter().all(|l| l[0][2] == json!(1.0)));

    let seeds: Vec<[f64; 3]> = vec![[0.0, 0.0, 0.0]; 201];
    let err = reject(&service, "streamlines", json!({ "field": "(1, 0, 0)", "seeds": seeds }));
    assert!(matches!(
        err,
        ApiError::Engine(EngineError::Validation(ValidationError::TooManySeeds { count: 201, max: 200 }))
    ));

    let err = reject(
        &service,
        "streamlines",
        json!({ "field": "(1, 0, 0)", "seedGrid": { "nx": 20, "ny": 20 } }),
    );
    assert_eq!(err.kind(), "validation");
}

#[test]
fn test_streamline_max_steps_is_clamped() {
    let service = FieldService::new();
    let body = call(
        &service,
        "streamlines",
        json!({ "field": "(1, 0, 0)", "seeds": [[-9, 0, 0]], "h": 0.001, "maxSteps": 100000, "direction": "forward" }),
    );
    assert_eq!(body["lines"][0].as_array().unwrap().len(), 2_000);
}

// ============================================================================
// line integrals
// ============================================================================

#[test]
fn test_line_integral_circulation() {
    let service = FieldService::new();
    let body = call(
        &service,
        "line-integral",
        json!({
            "field": "(-y, x, 0)",
            "curve": { "x": "cos(t)", "y": "sin(t)", "z": "0" },
            "tRange": [0, 2.0 * PI]
        }),
    );
    assert!((body["value"].as_f64().unwrap() - 2.0 * PI).abs() < 1e-12);
    assert_eq!(body["points"].as_array().unwrap().len(), 101);

    let text = call(
        &service,
        "line-integral",
        json!({ "field": "(-y, x, 0)", "curve": "(cos(t), sin(t), 0)", "tRange": [0, PI], "steps": 50 }),
    );
    assert!((text["value"].as_f64().unwrap() - PI).abs() < 1e-12);
    assert_eq!(text["parameters"].as_array().unwrap().len(), 51);
}

#[test]
fn test_line_integral_validation() {
    let service = FieldService::new();
    let err = reject(
        &service,
        "line-integral",
        json!({ "field": "(x, y, z)", "curve": "(t, t, t)", "tRange": [0] }),
    );
    assert!(err.to_string().contains("tRange"));

    let err = reject(
        &service,
        "line-integral",
        json!({ "field": "(x, y, z)", "curve": "(t, y, t)", "tRange": [0, 1] }),
    );
    assert_eq!(err.offending_token(), Some("y"));
}

// ============================================================================
// dispatch / service
// ============================================================================

#[test]
fn test_unknown_command_and_bad_payload() {
    let service = FieldService::new();
    let err = reject(&service, "gradient", json!({}));
    assert!(matches!(err, ApiError::UnknownCommand(ref c) if c == "gradient"));
    assert_eq!(err.kind(), "request");

    let err = reject(&service, "evaluate", json!({ "point": [0, 0, 0] }));
    assert!(matches!(err, ApiError::Payload(_)));
    assert_eq!(err.to_json()["kind"], "request");
}

#[test]
fn test_every_listed_command_is_routed() {
    let service = FieldService::new();
    for command in COMMANDS {
        let result = service.dispatch(command, json!({}));
        assert!(!matches!(result, Err(ApiError::UnknownCommand(_))), "{}", command);
    }
}

#[test]
fn test_health_and_cache_capacity() {
    let limits = EngineLimits::from_json(r#"{"cacheCapacity": 2}"#).unwrap();
    let service = FieldService::with_limits(limits);
    for field in ["(x, 0, 0)", "(y, 0, 0)", "(z, 0, 0)"] {
        call(&service, "compile", json!({ "field": field }));
    }
    let body = call(&service, "health", json!(null));
    assert_eq!(body, json!({ "status": "ok", "cachedFields": 2, "cacheCapacity": 2 }));
    assert_eq!(service.cache().keys(), vec!["y, 0, 0".to_string(), "z, 0, 0".to_string()]);
}

#[test]
fn test_global_service_is_shared() {
    let a = FieldService::global();
    let b = FieldService::global();
    assert!(std::ptr::eq(a, b));
    assert_eq!(a.limits(), &EngineLimits::default());
}
