use std::collections::BTreeSet;

use tokio::time::Instant;

use kgr_domain::{EntityType, SimilarityHit};

use crate::{Error, KgrService, Result, Stage, records};

impl KgrService {
	/// Top-`limit` entities nearest to `vector`, best first.
	///
	/// Issues exactly one index query. `entity_types`, when present and non-empty, restricts the
	/// candidates to those labels; `limit` falls back to `search.default_limit`.
	pub async fn vector_search(
		&self,
		vector: &[f32],
		entity_types: Option<&[EntityType]>,
		limit: Option<u32>,
	) -> Result<Vec<SimilarityHit>> {
		let expected_dim = self.cfg.storage.qdrant.vector_dim as usize;

		if vector.len() != expected_dim {
			return Err(Error::invalid(format!(
				"vector has {} dimensions; expected {expected_dim}.",
				vector.len()
			)));
		}
		if vector.iter().any(|component| !component.is_finite()) {
			return Err(Error::invalid("vector components must be finite."));
		}

		let limit = self.resolve_limit(limit)?;
		let labels: Vec<String> = entity_types
			.unwrap_or_default()
			.iter()
			.map(|entity_type| entity_type.as_str().to_string())
			.collect::<BTreeSet<_>>()
			.into_iter()
			.collect();
		let started = Instant::now();
		let rows = self.providers.vectors.similarity_search(vector, &labels, limit).await?;
		let elapsed_ms = started.elapsed().as_millis() as u64;

		if elapsed_ms > self.cfg.search.vector_latency_warn_ms {
			tracing::warn!(
				stage = Stage::VectorSearch.as_str(),
				elapsed_ms,
				threshold_ms = self.cfg.search.vector_latency_warn_ms,
				"Vector search latency above threshold."
			);
		}
		if rows.len() > limit as usize {
			return Err(Error::malformed(
				Stage::VectorSearch,
				format!("index returned {} rows for limit {limit}.", rows.len()),
			));
		}

		let mut hits = Vec::with_capacity(rows.len());

		for row in rows {
			if !row.score.is_finite() || !(0.0..=1.0).contains(&row.score) {
				return Err(Error::malformed(
					Stage::VectorSearch,
					format!("score {} of {} is outside [0, 1].", row.score, row.entity.entity_id),
				));
			}

			let entity = records::entity(Stage::VectorSearch, row.entity)?;

			hits.push(SimilarityHit { entity, score: row.score });
		}

		// Stable, so equal scores keep the index's order.
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));

		tracing::debug!(
			stage = Stage::VectorSearch.as_str(),
			elapsed_ms,
			limit,
			filtered = !labels.is_empty(),
			hit_count = hits.len(),
			"Vector search finished."
		);

		Ok(hits)
	}
}
