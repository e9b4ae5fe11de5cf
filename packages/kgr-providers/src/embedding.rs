use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// OpenAI-compatible embeddings client. Holds one connection pool for the life of the process.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
	http: Client,
	url: String,
}
impl EmbeddingClient {
	pub fn new(cfg: &kgr_config::EmbeddingProviderConfig) -> Result<Self> {
		let http = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.default_headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.build()?;
		let url = format!("{}{}", cfg.api_base.trim_end_matches('/'), cfg.path);

		Ok(Self { http, url })
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub async fn embed(
		&self,
		cfg: &kgr_config::EmbeddingProviderConfig,
		texts: &[String],
	) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let body = serde_json::json!({
			"model": cfg.model,
			"input": texts,
			"dimensions": cfg.dimensions,
		});
		let res = self.http.post(&self.url).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;
		let vectors = parse_embedding_response(json)?;

		if vectors.len() != texts.len() {
			return Err(Error::response(format!(
				"Embedding response returned {} vectors for {} inputs.",
				vectors.len(),
				texts.len()
			)));
		}

		tracing::debug!(
			provider_id = %cfg.provider_id,
			model = %cfg.model,
			inputs = texts.len(),
			"Embeddings fetched."
		);

		Ok(vectors)
	}
}

pub(crate) fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(Value::as_array)
		.ok_or_else(|| Error::response("Embedding response is missing data array."))?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(Value::as_u64)
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item
			.get("embedding")
			.and_then(Value::as_array)
			.ok_or_else(|| Error::response("Embedding item missing embedding array."))?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number =
				value.as_f64().ok_or_else(|| Error::response("Embedding value must be numeric."))?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}
