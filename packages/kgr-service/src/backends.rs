//! Capability implementations over the concrete drivers.

use kgr_config::EmbeddingProviderConfig;
use kgr_providers::EmbeddingClient;
use kgr_storage::{
	db::Db,
	graph::{self, Traversal},
	qdrant::{QdrantStore, ScoredEntity},
};

use crate::{BoxFuture, EmbeddingProvider, Error, GraphStore, Result, Stage, VectorIndex};

impl EmbeddingProvider for EmbeddingClient {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(EmbeddingClient::embed(self, cfg, texts).await?) })
	}
}

impl VectorIndex for QdrantStore {
	fn similarity_search<'a>(
		&'a self,
		vector: &'a [f32],
		entity_types: &'a [String],
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredEntity>>> {
		Box::pin(async move {
			QdrantStore::similarity_search(self, vector, entity_types, limit)
				.await
				.map_err(|err| Error::store(Stage::VectorSearch, err))
		})
	}
}

impl GraphStore for Db {
	fn traverse<'a>(
		&'a self,
		seed_ids: &'a [String],
		max_hops: u32,
	) -> BoxFuture<'a, Result<Traversal>> {
		Box::pin(async move {
			let mut conn = self
				.pool
				.acquire()
				.await
				.map_err(|err| Error::store(Stage::Expand, err.into()))?;

			graph::traverse(&mut conn, seed_ids, max_hops)
				.await
				.map_err(|err| Error::store(Stage::Expand, err))
		})
	}
}
