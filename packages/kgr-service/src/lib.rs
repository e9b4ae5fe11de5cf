pub mod assemble;
pub mod compose;
pub mod expand;
pub mod search;
pub mod vector_search;

mod backends;
mod error;
mod records;

pub use assemble::{Direction, GraphData, GraphEntity, GraphRelation, assemble};
pub use compose::{ContextEntity, ContextPayload, ContextRelation, EvidenceSource, compose};
pub use error::{Error, Result};
pub use search::{SEARCH_MAX_HOPS, SearchRequest, SearchResult, SearchTrace, StageSpan};

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};

use kgr_config::{Config, EmbeddingProviderConfig};
use kgr_storage::{graph::Traversal, qdrant::ScoredEntity};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns text into vectors. Failures surface as [`Error::EmbeddingUnavailable`].
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Similarity index over embedded entities. An empty `entity_types` slice means no filter.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn similarity_search<'a>(
		&'a self,
		vector: &'a [f32],
		entity_types: &'a [String],
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredEntity>>>;
}

/// Bounded neighborhood lookup over the relation graph.
pub trait GraphStore
where
	Self: Send + Sync,
{
	fn traverse<'a>(
		&'a self,
		seed_ids: &'a [String],
		max_hops: u32,
	) -> BoxFuture<'a, Result<Traversal>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Classify,
	Embed,
	VectorSearch,
	Expand,
	Assemble,
	Compose,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Classify => "classify",
			Self::Embed => "embed",
			Self::VectorSearch => "vector_search",
			Self::Expand => "expand",
			Self::Assemble => "assemble",
			Self::Compose => "compose",
		}
	}
}
impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub vectors: Arc<dyn VectorIndex>,
	pub graph: Arc<dyn GraphStore>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		vectors: Arc<dyn VectorIndex>,
		graph: Arc<dyn GraphStore>,
	) -> Self {
		Self { embedding, vectors, graph }
	}
}

/// Entry point for every retrieval call. Holds no per-call state, so one instance is shared by all
/// requests.
pub struct KgrService {
	pub cfg: Config,
	pub providers: Providers,
}
impl KgrService {
	pub fn new(cfg: Config, providers: Providers) -> Self {
		Self { cfg, providers }
	}

	pub(crate) fn resolve_limit(&self, limit: Option<u32>) -> Result<u32> {
		let limit = limit.unwrap_or(self.cfg.search.default_limit);

		if limit == 0 {
			return Err(Error::invalid("limit must be at least 1."));
		}
		if limit > self.cfg.search.max_limit {
			return Err(Error::invalid(format!(
				"limit must be at most {}.",
				self.cfg.search.max_limit
			)));
		}

		Ok(limit)
	}
}
