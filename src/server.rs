use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use color_eyre::eyre::Result;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::data::error::{ErrorKind, InvocationError};
use crate::data::registry::{ExerciseRegistry, ExerciseSummary};
use crate::data::types::{ExerciseCallRequest, InvocationRequest, InvocationResult};
use crate::data::ContractCallService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ContractCallService>,
    pub registry: Arc<ExerciseRegistry>,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MalformedRequest
        | ErrorKind::FunctionNotFound
        | ErrorKind::NotReadOnly
        | ErrorKind::Encoding => StatusCode::BAD_REQUEST,
        ErrorKind::UnknownExercise => StatusCode::NOT_FOUND,
        ErrorKind::Revert | ErrorKind::Panic | ErrorKind::CustomError => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::Decoding | ErrorKind::Transport => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for InvocationResult {
    fn into_response(self) -> Response {
        let status = match &self {
            InvocationResult::Success(_) => StatusCode::OK,
            InvocationResult::Failure(err) => status_for(err.kind()),
        };
        (status, Json(self)).into_response()
    }
}

/// Turn a body the JSON extractor refused into the usual failure envelope.
fn rejected(rejection: JsonRejection) -> Response {
    let status = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    let result = InvocationResult::Failure(InvocationError::MalformedRequest(rejection.body_text()));
    (status, Json(result)).into_response()
}

async fn contract_call(
    State(state): State<AppState>,
    payload: Result<Json<InvocationRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => state.service.invoke(request).await.into_response(),
        Err(rejection) => rejected(rejection),
    }
}

async fn exercise_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ExerciseCallRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => state
            .service
            .invoke_exercise(&state.registry, &id, request)
            .await
            .into_response(),
        Err(rejection) => rejected(rejection),
    }
}

async fn list_exercises(State(state): State<AppState>) -> Json<Vec<ExerciseSummary>> {
    Json(state.registry.iter().map(ExerciseSummary::from).collect())
}

async fn healthz(State(state): State<AppState>) -> Response {
    let chain_id = state.service.chain_id();
    match state.service.latest_block_number().await {
        Ok(block) => Json(json!({
            "status": "ok",
            "chainId": chain_id,
            "latestBlock": block,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(target: "contract-proxy", error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "chainId": chain_id,
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/api/contract-call", post(contract_call))
        .route("/api/exercises", get(list_exercises))
        .route("/api/exercises/:id/call", post(exercise_call))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit_bytes))
}

/// Serve `app` on `listen` until Ctrl-C.
pub async fn serve(listen: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(target: "contract-proxy", "listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!(target: "contract-proxy", "shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use alloy::dyn_abi::DynSolValue;
    use alloy::primitives::{Address, Bytes};
    use alloy::sol_types::{Panic, Revert, SolError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::data::provider::{CallFailure, ContractCaller};

    struct StaticCaller(Result<Bytes, CallFailure>);

    #[async_trait]
    impl ContractCaller for StaticCaller {
        fn chain_id(&self) -> u64 {
            84532
        }

        async fn call(&self, _to: Address, _input: Bytes) -> Result<Bytes, CallFailure> {
            self.0.clone()
        }

        async fn latest_block_number(&self) -> Result<u64, CallFailure> {
            match &self.0 {
                Err(CallFailure::Transport(msg)) => Err(CallFailure::Transport(msg.clone())),
                _ => Ok(18_000_000),
            }
        }
    }

    fn app(response: Result<Bytes, CallFailure>) -> Router {
        let service = ContractCallService::new(
            Arc::new(StaticCaller(response)),
            Duration::from_secs(5),
        );
        let state = AppState {
            service: Arc::new(service),
            registry: Arc::new(ExerciseRegistry::builtin().unwrap()),
        };
        router(state, 16 * 1024)
    }

    fn returning_string(s: &str) -> Result<Bytes, CallFailure> {
        Ok(DynSolValue::Tuple(vec![DynSolValue::String(s.into())])
            .abi_encode_params()
            .into())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn fizz_buzz_call(arg: Value) -> Value {
        json!({
            "address": "0xaB6B6c13Fd72A92D27096d779F8188F85F4bb5Be",
            "abi": [{"type":"function","name":"fizzBuzz","inputs":[{"name":"_number","type":"uint256"}],"outputs":[{"name":"","type":"string"}],"stateMutability":"pure"}],
            "functionName": "fizzBuzz",
            "args": [arg]
        })
    }

    #[tokio::test]
    async fn test_contract_call_success() {
        let (status, body) = send(
            app(returning_string("FizzBuzz")),
            post_json("/api/contract-call", fizz_buzz_call(json!("15"))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "result": "FizzBuzz"}));
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let request = Request::post("/api/contract-call")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(returning_string("x")), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["kind"], json!("malformed_request"));
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let (status, body) = send(
            app(returning_string("x")),
            post_json("/api/contract-call", json!({"address": "0x00"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], json!("malformed_request"));
    }

    #[tokio::test]
    async fn test_revert_maps_to_unprocessable() {
        let data = Revert {
            reason: "At lunch!".into(),
        }
        .abi_encode();
        let (status, body) = send(
            app(Err(CallFailure::Reverted(data.into()))),
            post_json("/api/contract-call", fizz_buzz_call(json!("1"))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], json!("execution reverted: At lunch!"));
    }

    #[tokio::test]
    async fn test_panic_maps_to_unprocessable() {
        let data = Panic {
            code: alloy::primitives::U256::from(0x11),
        }
        .abi_encode();
        let (status, body) = send(
            app(Err(CallFailure::Reverted(data.into()))),
            post_json("/api/contract-call", fizz_buzz_call(json!("1"))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], json!("panic"));
    }

    #[tokio::test]
    async fn test_transport_maps_to_bad_gateway() {
        let (status, body) = send(
            app(Err(CallFailure::Transport("connection refused".into()))),
            post_json("/api/contract-call", fizz_buzz_call(json!("1"))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], json!("transport"));
    }

    #[tokio::test]
    async fn test_argument_error_maps_to_bad_request() {
        let (status, body) = send(
            app(returning_string("x")),
            post_json("/api/contract-call", fizz_buzz_call(json!("-1"))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], json!("encoding"));
    }

    #[tokio::test]
    async fn test_list_exercises() {
        let request = Request::get("/api/exercises").body(Body::empty()).unwrap();
        let (status, body) = send(app(returning_string("x")), request).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        let control = entries
            .iter()
            .find(|e| e["id"] == json!("control-structures"))
            .unwrap();
        assert_eq!(
            control["address"],
            json!("0xaB6B6c13Fd72A92D27096d779F8188F85F4bb5Be")
        );
        assert_eq!(control["functions"], json!(["doNotDisturb", "fizzBuzz"]));
    }

    #[tokio::test]
    async fn test_exercise_call() {
        let (status, body) = send(
            app(returning_string("Fizz")),
            post_json(
                "/api/exercises/control-structures/call",
                json!({"functionName": "fizzBuzz", "args": ["3"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!("Fizz"));
    }

    #[tokio::test]
    async fn test_unknown_exercise_is_not_found() {
        let (status, body) = send(
            app(returning_string("x")),
            post_json(
                "/api/exercises/nope/call",
                json!({"functionName": "fizzBuzz", "args": ["3"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], json!("unknown_exercise"));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let padding = "a".repeat(32 * 1024);
        let (status, body) = send(
            app(returning_string("x")),
            post_json("/api/contract-call", fizz_buzz_call(json!(padding))),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["kind"], json!("malformed_request"));
    }

    #[tokio::test]
    async fn test_oversized_body_with_content_length_keeps_envelope() {
        let payload = fizz_buzz_call(json!("a".repeat(32 * 1024))).to_string();
        let request = Request::post("/api/contract-call")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, payload.len())
            .body(Body::from(payload))
            .unwrap();
        let (status, body) = send(app(returning_string("x")), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["kind"], json!("malformed_request"));
    }

    #[tokio::test]
    async fn test_healthz_ok() {
        let request = Request::get("/healthz").body(Body::empty()).unwrap();
        let (status, body) = send(app(returning_string("x")), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "ok", "chainId": 84532, "latestBlock": 18_000_000})
        );
    }

    #[tokio::test]
    async fn test_healthz_degraded() {
        let request = Request::get("/healthz").body(Body::empty()).unwrap();
        let (status, body) = send(
            app(Err(CallFailure::Transport("node down".into()))),
            request,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], json!("degraded"));
        assert_eq!(body["error"], json!("node down"));
    }
}
