//! In-process mock of the FMR services and the VTL rule engine.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::PipelineConfig;

pub(crate) const GLEIF_SAMPLE: &str = include_str!("../fixtures/gleif_sample.csv");

/// What the mock answers.
#[derive(Clone)]
pub(crate) struct MockBehaviour {
    /// `loadStatus` polls answered with `Validating` before the final body
    pub pending_polls: usize,
    pub final_status: Value,
    pub upload_status: StatusCode,
    pub engine_results: Value,
    /// Non-200 makes the engine answer `{"error": ..}` with this status
    pub engine_status: StatusCode,
    /// Replaces the published transformation scheme message
    pub scheme_body: Option<Value>,
}

impl Default for MockBehaviour {
    fn default() -> Self {
        Self {
            pending_polls: 1,
            final_status: valid_status(),
            upload_status: StatusCode::OK,
            engine_results: one_failing_rule(),
            engine_status: StatusCode::OK,
            scheme_body: None,
        }
    }
}

/// What the mock received.
#[derive(Default)]
pub(crate) struct Recorded {
    pub uploads: Mutex<Vec<String>>,
    pub data_formats: Mutex<Vec<String>>,
    pub engine_requests: Mutex<Vec<Value>>,
    pub polls: AtomicUsize,
}

struct MockState {
    behaviour: MockBehaviour,
    recorded: Arc<Recorded>,
}

pub(crate) struct MockServer {
    /// SDMX REST endpoint, e.g. `http://127.0.0.1:PORT/sdmx/v2`
    pub endpoint: String,
    pub recorded: Arc<Recorded>,
}

pub(crate) async fn spawn(behaviour: MockBehaviour) -> MockServer {
    let recorded = Arc::new(Recorded::default());
    let state = Arc::new(MockState {
        behaviour,
        recorded: recorded.clone(),
    });

    let app = Router::new()
        .route("/sdmx/v2/structure/datastructure/MD/LEI_DATA/1.0", get(data_structure))
        .route(
            "/sdmx/v2/structure/transformationscheme/MD/LEI_VALIDATIONS/1.0",
            get(transformation_scheme),
        )
        .route("/sdmx/v2/vtl/run", post(vtl_run))
        .route("/ws/public/data/load", post(load))
        .route("/ws/public/data/loadStatus", get(load_status))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        endpoint: format!("http://{}/sdmx/v2", addr),
        recorded,
    }
}

/// Config pointing at the mock, with the fixture copied into `dir`.
pub(crate) fn config_for(server: &MockServer, dir: &Path) -> PipelineConfig {
    let input = dir.join("gleif.csv");
    std::fs::write(&input, GLEIF_SAMPLE).unwrap();

    let mut config = PipelineConfig::default();
    config.input_path = input;
    config.row_limit = 10;
    config.registry_endpoint = server.endpoint.clone();
    config.script_query.api_endpoint = server.endpoint.clone();
    config.output_path = Some(dir.join("output").join("lei_to_sdmx.csv"));
    config.logs_folder = Some(dir.join("log"));
    config.poll_interval_ms = 5;
    config.request_timeout_secs = 5;
    config
}

pub(crate) fn valid_status() -> Value {
    json!({ "Status": "Complete", "Datasets": [{ "Errors": false }] })
}

pub(crate) fn invalid_status() -> Value {
    json!({
        "Status": "Complete",
        "Datasets": [{
            "Errors": true,
            "ValidationReport": [{
                "Type": "Codelist",
                "Errors": [{
                    "ErrorCode": "REG-201-061",
                    "Message": "Value 'T91T' is not a valid code for LEGAL_FORM",
                    "Position": { "Row": 2 }
                }]
            }]
        }]
    })
}

pub(crate) fn one_failing_rule() -> Value {
    json!({
        "invalid_legal_form": {
            "columns": ["LEI", "LEGAL_FORM", "bool_var", "errorcode"],
            "rows": [["004L5FPTUREIWK9T2N63", "T91T", false, "LF01"]]
        },
        "missing_postal_code": {
            "columns": ["LEI", "bool_var", "errorcode"],
            "rows": []
        }
    })
}

async fn data_structure() -> Json<Value> {
    let attribute = |id: &str, usage: &str| json!({ "id": id, "usage": usage });
    Json(json!({
        "data": {
            "dataStructures": [{
                "id": "LEI_DATA",
                "agencyID": "MD",
                "version": "1.0",
                "dataStructureComponents": {
                    "dimensionList": { "dimensions": [{ "id": "LEI" }] },
                    "attributeList": { "attributes": [
                        attribute("LEGAL_NAME", "mandatory"),
                        attribute("COUNTRY_INCORPORATION", "mandatory"),
                        attribute("COUNTRY_HEADQUARTERS", "optional"),
                        attribute("CATEGORY", "optional"),
                        attribute("SUBCATEGORY", "optional"),
                        attribute("LEGAL_FORM", "optional"),
                        attribute("POSTAL_CODE", "optional")
                    ]},
                    "measureList": { "measures": [] }
                }
            }]
        }
    }))
}

/// Scheme message holding the given transformations.
pub(crate) fn scheme_with(transformations: Value) -> Value {
    json!({
        "data": {
            "transformationSchemes": [{
                "id": "LEI_VALIDATIONS",
                "agencyID": "MD",
                "version": "1.0",
                "transformations": transformations
            }]
        }
    })
}

async fn transformation_scheme(State(state): State<Arc<MockState>>) -> Json<Value> {
    if let Some(ref body) = state.behaviour.scheme_body {
        return Json(body.clone());
    }
    Json(json!({
        "data": {
            "transformationSchemes": [{
                "id": "LEI_VALIDATIONS",
                "agencyID": "MD",
                "version": "1.0",
                "vtlVersion": "2.0",
                "transformations": [
                    {
                        "id": "T1",
                        "result": "invalid_legal_form",
                        "expression": "check(LEI_DATA#LEGAL_FORM <> \"T91T\" errorcode \"LF01\" invalid)",
                        "isPersistent": true
                    },
                    {
                        "id": "T2",
                        "result": "missing_postal_code",
                        "expression": "check(not isnull(LEI_DATA#POSTAL_CODE) invalid)",
                        "isPersistent": true
                    }
                ]
            }]
        }
    }))
}

async fn load(State(state): State<Arc<MockState>>, headers: HeaderMap, body: String) -> (StatusCode, Json<Value>) {
    if let Some(format) = headers.get("Data-Format").and_then(|v| v.to_str().ok()) {
        state.recorded.data_formats.lock().unwrap().push(format.to_string());
    }
    state.recorded.uploads.lock().unwrap().push(body);

    if state.behaviour.upload_status != StatusCode::OK {
        return (state.behaviour.upload_status, Json(json!({ "error": "upload refused" })));
    }
    (StatusCode::OK, Json(json!({ "uid": "a1b2c3" })))
}

async fn load_status(State(state): State<Arc<MockState>>) -> Json<Value> {
    let poll = state.recorded.polls.fetch_add(1, Ordering::SeqCst);
    if poll < state.behaviour.pending_polls {
        return Json(json!({ "Status": "Validating" }));
    }
    Json(state.behaviour.final_status.clone())
}

async fn vtl_run(State(state): State<Arc<MockState>>, Json(request): Json<Value>) -> (StatusCode, Json<Value>) {
    state.recorded.engine_requests.lock().unwrap().push(request);
    if state.behaviour.engine_status != StatusCode::OK {
        let error = json!({ "error": "Syntax error at line 1: unexpected token 'chek'" });
        return (state.behaviour.engine_status, Json(error));
    }
    (StatusCode::OK, Json(json!({ "results": state.behaviour.engine_results.clone() })))
}
