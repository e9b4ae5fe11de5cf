use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub context: Context,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Number of similarity hits returned when the caller does not pass a limit.
	pub default_limit: u32,
	pub max_limit: u32,
	/// Whole-call budget applied when the request carries no `timeout_ms`.
	pub timeout_ms: Option<u64>,
	/// Vector search slower than this is logged as degraded; the call still completes.
	pub vector_latency_warn_ms: u64,
	pub expansion: SearchExpansion,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_limit: 10,
			max_limit: 100,
			timeout_ms: None,
			vector_latency_warn_ms: 1_000,
			expansion: SearchExpansion::default(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchExpansion {
	/// Default hop count for direct `expand` calls that do not pass one. `search` always expands
	/// two hops.
	pub max_hops: u32,
	/// Optional hard cap on expanded entities. The hop bound stays authoritative; this only trims
	/// the farthest entities when set.
	pub max_entities: Option<u32>,
}
impl Default for SearchExpansion {
	fn default() -> Self {
		Self { max_hops: 2, max_entities: None }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Context {
	pub max_hits: u32,
	pub max_graph_entities: u32,
	pub max_relations: u32,
	/// Longest string kept at any depth of an entity's properties.
	pub max_property_chars: u32,
	/// Upper bound on the serialized size of one entity's properties.
	pub max_entity_chars: u32,
}
impl Default for Context {
	fn default() -> Self {
		Self {
			max_hits: 10,
			max_graph_entities: 25,
			max_relations: 50,
			max_property_chars: 400,
			max_entity_chars: 2_000,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
}
