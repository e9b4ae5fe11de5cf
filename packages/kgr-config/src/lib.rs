mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Context, EmbeddingProviderConfig, Postgres, Providers, Qdrant, Search,
	SearchExpansion, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::invalid("service.http_bind", "must be non-empty"));
	}

	let embedding = &cfg.providers.embedding;

	if embedding.dimensions == 0 {
		return Err(Error::invalid("providers.embedding.dimensions", "must be greater than zero"));
	}
	if embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::invalid(
			"providers.embedding.dimensions",
			"must match storage.qdrant.vector_dim",
		));
	}
	if embedding.api_key.trim().is_empty() {
		return Err(Error::invalid("providers.embedding.api_key", "must be non-empty"));
	}
	if embedding.timeout_ms == 0 {
		return Err(Error::invalid("providers.embedding.timeout_ms", "must be greater than zero"));
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::invalid("storage.qdrant.collection", "must be non-empty"));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::invalid("storage.postgres.pool_max_conns", "must be greater than zero"));
	}

	let search = &cfg.search;

	if search.default_limit == 0 {
		return Err(Error::invalid("search.default_limit", "must be greater than zero"));
	}
	if search.max_limit < search.default_limit {
		return Err(Error::invalid(
			"search.max_limit",
			"must be greater than or equal to search.default_limit",
		));
	}
	if search.timeout_ms == Some(0) {
		return Err(Error::invalid("search.timeout_ms", "must be greater than zero"));
	}
	if search.vector_latency_warn_ms == 0 {
		return Err(Error::invalid("search.vector_latency_warn_ms", "must be greater than zero"));
	}
	if !matches!(search.expansion.max_hops, 1 | 2) {
		return Err(Error::invalid("search.expansion.max_hops", "must be 1 or 2"));
	}
	if search.expansion.max_entities == Some(0) {
		return Err(Error::invalid("search.expansion.max_entities", "must be greater than zero"));
	}

	for (field, value) in [
		("context.max_hits", cfg.context.max_hits),
		("context.max_graph_entities", cfg.context.max_graph_entities),
		("context.max_relations", cfg.context.max_relations),
		("context.max_property_chars", cfg.context.max_property_chars),
		("context.max_entity_chars", cfg.context.max_entity_chars),
	] {
		if value == 0 {
			return Err(Error::invalid(field, "must be greater than zero"));
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg.storage.qdrant.url.ends_with('/') {
		cfg.storage.qdrant.url = cfg.storage.qdrant.url.trim_end_matches('/').to_string();
	}
}
