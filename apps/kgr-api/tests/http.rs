use std::{sync::Arc, time::Duration};

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use kgr_api::{routes, state::AppState};
use kgr_config::{
	Config, Context, EmbeddingProviderConfig, Postgres, Providers as ProviderSettings, Qdrant,
	Search, SearchExpansion, Security, Service, Storage,
};
use kgr_service::{
	BoxFuture, EmbeddingProvider, Error, GraphStore, KgrService, Providers, Result, Stage,
	VectorIndex,
};
use kgr_storage::{
	graph::Traversal,
	models::{EntityRow, ReachedEntity, RelationRow},
	qdrant::ScoredEntity,
};

const DIM: usize = 4;

struct StaticEmbedding;
impl EmbeddingProvider for StaticEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(vec![vec![0.25; DIM]; texts.len()]) })
	}
}

struct StaticIndex {
	down: bool,
}
impl VectorIndex for StaticIndex {
	fn similarity_search<'a>(
		&'a self,
		_vector: &'a [f32],
		_entity_types: &'a [String],
		_limit: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredEntity>>> {
		Box::pin(async move {
			if self.down {
				return Err(Error::StoreUnavailable {
					stage: Stage::VectorSearch,
					message: "connection refused".to_string(),
				});
			}

			Ok(vec![ScoredEntity { entity: entity("drug:metformin", "Drug"), score: 0.93 }])
		})
	}
}

struct StaticGraph {
	delay: Option<Duration>,
}
impl GraphStore for StaticGraph {
	fn traverse<'a>(
		&'a self,
		_seed_ids: &'a [String],
		_max_hops: u32,
	) -> BoxFuture<'a, Result<Traversal>> {
		Box::pin(async move {
			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			Ok(Traversal {
				entities: vec![
					ReachedEntity { entity: entity("drug:metformin", "Drug"), hop: 0 },
					ReachedEntity { entity: entity("disease:t2d", "Disease"), hop: 1 },
				],
				relations: vec![RelationRow {
					relation_id: "rel:treats".to_string(),
					relation_type: "TREATS".to_string(),
					from_entity_id: "drug:metformin".to_string(),
					to_entity_id: "disease:t2d".to_string(),
					properties: json!({ "evidence": "clinical" }),
				}],
			})
		})
	}
}

fn entity(id: &str, label: &str) -> EntityRow {
	EntityRow {
		entity_id: id.to_string(),
		labels: vec![label.to_string()],
		display_name: id.rsplit(':').next().unwrap_or(id).to_string(),
		properties: json!({}),
	}
}

fn test_config(api_auth_token: Option<&str>) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage {
			postgres: Postgres { dsn: "postgres://localhost/kgr".to_string(), pool_max_conns: 1 },
			qdrant: Qdrant {
				url: "http://localhost:6334".to_string(),
				collection: "kg_entities".to_string(),
				vector_dim: DIM as u32,
			},
		},
		providers: ProviderSettings {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions: DIM as u32,
				timeout_ms: 1_000,
				default_headers: Default::default(),
			},
		},
		search: Search {
			default_limit: 5,
			max_limit: 50,
			timeout_ms: None,
			vector_latency_warn_ms: 1_000,
			expansion: SearchExpansion { max_hops: 2, max_entities: None },
		},
		context: Context::default(),
		security: Security {
			bind_localhost_only: true,
			api_auth_token: api_auth_token.map(str::to_string),
		},
	}
}

fn app_with(cfg: Config, index: StaticIndex, graph: StaticGraph) -> Router {
	let providers = Providers::new(Arc::new(StaticEmbedding), Arc::new(index), Arc::new(graph));

	routes::router(AppState::from_service(KgrService::new(cfg, providers)))
}

fn app() -> Router {
	app_with(test_config(None), StaticIndex { down: false }, StaticGraph { delay: None })
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("Failed to build request.")
}

async fn read_json(response: axum::response::Response) -> Value {
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&body).expect("Failed to parse response.")
}

#[tokio::test]
async fn health_is_open() {
	let app = app_with(
		test_config(Some("s3cret")),
		StaticIndex { down: false },
		StaticGraph { delay: None },
	);
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Bad request."))
		.await
		.expect("Failed to call health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_returns_hits_graph_and_context() {
	let response = app()
		.oneshot(post_json(
			"/v1/search",
			json!({ "query": "What treats diabetes?", "compose_context": true }),
		))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = read_json(response).await;

	assert_eq!(json["query_type"], "hybrid");
	assert_eq!(json["mode_forced"], false);
	assert_eq!(json["entities"][0]["entity"]["id"], "drug:metformin");
	assert_eq!(json["graph_data"]["entities"][1]["id"], "disease:t2d");
	assert_eq!(json["graph_data"]["entities"][1]["hop"], 1);
	assert_eq!(json["graph_data"]["relationships"][0]["type"], "TREATS");
	assert_eq!(json["graph_data"]["relationships"][0]["direction"], "outgoing");
	assert_eq!(json["context"]["graph"], true);
	assert_eq!(json["trace"]["stages"][0]["stage"], "classify");
}

#[tokio::test]
async fn forced_exact_mode_returns_no_graph() {
	let response = app()
		.oneshot(post_json("/v1/search", json!({ "query": "metformin", "mode": "exact" })))
		.await
		.expect("Failed to call search.");
	let json = read_json(response).await;

	assert_eq!(json["query_type"], "exact");
	assert_eq!(json["mode_forced"], true);
	assert_eq!(json["graph_data"]["entities"], json!([]));
	assert!(json.get("context").is_none());
}

#[tokio::test]
async fn empty_query_is_a_bad_request() {
	let response = app()
		.oneshot(post_json("/v1/search", json!({ "query": "  " })))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let json = read_json(response).await;

	assert_eq!(json["error_code"], "INVALID_INPUT");
	assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn vector_search_checks_dimensions() {
	let response = app()
		.oneshot(post_json("/v1/vector_search", json!({ "vector": [0.1, 0.2] })))
		.await
		.expect("Failed to call vector_search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let response = app()
		.oneshot(post_json(
			"/v1/vector_search",
			json!({ "vector": [0.1, 0.2, 0.3, 0.4], "entity_types": ["Drug"], "limit": 3 }),
		))
		.await
		.expect("Failed to call vector_search.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = read_json(response).await;

	assert_eq!(json["hits"][0]["entity"]["entity_type"], "Drug");
}

#[tokio::test]
async fn expand_returns_entities_and_relationships() {
	let response = app()
		.oneshot(post_json("/v1/expand", json!({ "seed_ids": ["drug:metformin"], "max_hops": 1 })))
		.await
		.expect("Failed to call expand.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = read_json(response).await;

	assert_eq!(json["entities"].as_array().map(Vec::len), Some(2));
	assert_eq!(json["relationships"][0]["id"], "rel:treats");

	let response = app()
		.oneshot(post_json("/v1/expand", json!({ "seed_ids": ["drug:metformin"], "max_hops": 3 })))
		.await
		.expect("Failed to call expand.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_outage_maps_to_service_unavailable() {
	let app =
		app_with(test_config(None), StaticIndex { down: true }, StaticGraph { delay: None });
	let response = app
		.oneshot(post_json("/v1/search", json!({ "query": "what treats diabetes" })))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

	let json = read_json(response).await;

	assert_eq!(json["error_code"], "STORE_UNAVAILABLE");
	assert_eq!(json["stage"], "vector_search");
	assert_eq!(json["retryable"], true);
}

#[tokio::test]
async fn slow_expansion_maps_to_gateway_timeout() {
	let app = app_with(
		test_config(None),
		StaticIndex { down: false },
		StaticGraph { delay: Some(Duration::from_millis(500)) },
	);
	let response = app
		.oneshot(post_json(
			"/v1/search",
			json!({ "query": "what treats diabetes", "timeout_ms": 50 }),
		))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

	let json = read_json(response).await;

	assert_eq!(json["stage"], "expand");
}

#[tokio::test]
async fn api_routes_require_the_configured_bearer_token() {
	let build = || {
		app_with(
			test_config(Some("s3cret")),
			StaticIndex { down: false },
			StaticGraph { delay: None },
		)
	};
	let response = build()
		.oneshot(post_json("/v1/search", json!({ "query": "metformin" })))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let mut request = post_json("/v1/search", json!({ "query": "metformin" }));

	request
		.headers_mut()
		.insert("authorization", "Bearer s3cret".parse().expect("Invalid header value."));

	let response = build().oneshot(request).await.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::OK);
}
