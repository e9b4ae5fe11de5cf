use axum::{
	Json, Router,
	extract::{Request, State},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use kgr_domain::{EntityType, SimilarityHit, Subgraph};
use kgr_service::{Error, SearchRequest, SearchResult, Stage};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VectorSearchBody {
	pub vector: Vec<f32>,
	#[serde(default)]
	pub entity_types: Option<Vec<EntityType>>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct VectorSearchResponse {
	pub hits: Vec<SimilarityHit>,
}

#[derive(Debug, Deserialize)]
pub struct ExpandBody {
	pub seed_ids: Vec<String>,
	/// Falls back to `search.expansion.max_hops`.
	#[serde(default)]
	pub max_hops: Option<u32>,
}

pub fn router(state: AppState) -> Router {
	let v1 = Router::new()
		.route("/v1/search", post(search))
		.route("/v1/vector_search", post(vector_search))
		.route("/v1/expand", post(expand))
		.route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

	Router::new().route("/health", get(health)).merge(v1).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResult>, ApiError> {
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn vector_search(
	State(state): State<AppState>,
	Json(payload): Json<VectorSearchBody>,
) -> Result<Json<VectorSearchResponse>, ApiError> {
	let hits = state
		.service
		.vector_search(&payload.vector, payload.entity_types.as_deref(), payload.limit)
		.await?;

	Ok(Json(VectorSearchResponse { hits }))
}

async fn expand(
	State(state): State<AppState>,
	Json(payload): Json<ExpandBody>,
) -> Result<Json<Subgraph>, ApiError> {
	let max_hops = payload.max_hops.unwrap_or(state.service.cfg.search.expansion.max_hops);
	let subgraph = state.service.expand(&payload.seed_ids, max_hops).await?;

	Ok(Json(subgraph))
}

async fn require_bearer(State(state): State<AppState>, req: Request, next: Next) -> Response {
	let Some(expected) = state.auth_token.as_deref() else {
		return next.run(req).await;
	};

	if read_bearer_token(req.headers()) != Some(expected) {
		return ApiError::new(
			StatusCode::UNAUTHORIZED,
			"UNAUTHORIZED",
			"A valid Bearer token is required.",
		)
		.into_response();
	}

	next.run(req).await
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	stage: Option<Stage>,
	retryable: bool,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
	stage: Option<Stage>,
	retryable: bool,
}
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into(), stage: None, retryable: false }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let (status, error_code) = match &err {
			Error::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
			Error::StoreUnavailable { .. } =>
				(StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
			Error::EmbeddingUnavailable { .. } =>
				(StatusCode::SERVICE_UNAVAILABLE, "EMBEDDING_UNAVAILABLE"),
			Error::StoreDataError { .. } => (StatusCode::BAD_GATEWAY, "STORE_DATA_ERROR"),
			Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, error_code, "Request failed.");
		}

		Self {
			status,
			error_code,
			message: err.to_string(),
			stage: err.stage(),
			retryable: err.is_retryable(),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			stage: self.stage,
			retryable: self.retryable,
		};

		(self.status, Json(body)).into_response()
	}
}
