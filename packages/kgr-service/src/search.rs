use std::future::Future;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::time::{self as tokio_time, Instant};
use uuid::Uuid;

use kgr_domain::{EntityType, QueryType, SimilarityHit, classify};

use crate::{ContextPayload, Error, GraphData, KgrService, Result, Stage, assemble, compose};

/// Hop radius `search` expands vector hits by. Callers of `expand` choose their own.
pub const SEARCH_MAX_HOPS: u32 = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	/// Forces the retrieval strategy instead of classifying the query.
	#[serde(default)]
	pub mode: Option<QueryType>,
	#[serde(default)]
	pub limit: Option<u32>,
	#[serde(default)]
	pub entity_types: Option<Vec<EntityType>>,
	#[serde(default)]
	pub compose_context: bool,
	/// Overrides `search.timeout_ms` for this call.
	#[serde(default)]
	pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
	pub query_type: QueryType,
	pub mode_forced: bool,
	pub entities: Vec<SimilarityHit>,
	pub graph_data: GraphData,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub context: Option<ContextPayload>,
	pub trace: SearchTrace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTrace {
	pub trace_id: Uuid,
	pub stages: Vec<StageSpan>,
}
impl SearchTrace {
	pub fn span(&self, stage: Stage) -> Option<&StageSpan> {
		self.stages.iter().find(|span| span.stage == stage)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpan {
	pub stage: Stage,
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	pub elapsed_ms: f64,
}

/// Per-call stage clock. Start timestamps are derived from a monotonic clock anchored at the
/// call's wall-clock start, so they never go backwards within a call.
struct StageClock {
	trace_id: Uuid,
	wall_anchor: OffsetDateTime,
	anchor: Instant,
	deadline: Option<(Instant, u64)>,
	stages: Vec<StageSpan>,
}
impl StageClock {
	fn start(budget_ms: Option<u64>) -> Self {
		let anchor = Instant::now();
		let deadline = budget_ms
			.map(|budget_ms| (anchor + std::time::Duration::from_millis(budget_ms), budget_ms));

		Self {
			trace_id: Uuid::new_v4(),
			wall_anchor: OffsetDateTime::now_utc(),
			anchor,
			deadline,
			stages: Vec::new(),
		}
	}

	async fn run<F, T>(&mut self, stage: Stage, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let started = Instant::now();
		let outcome = match self.deadline {
			Some((deadline, budget_ms)) => tokio_time::timeout_at(deadline, fut)
				.await
				.unwrap_or_else(|_| Err(Error::Timeout { stage, budget_ms })),
			None => fut.await,
		};

		self.finish(stage, started);

		outcome
	}

	fn step<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> Result<T> {
		let started = Instant::now();

		if let Some((deadline, budget_ms)) = self.deadline
			&& started >= deadline
		{
			return Err(Error::Timeout { stage, budget_ms });
		}

		let value = f();

		self.finish(stage, started);

		Ok(value)
	}

	fn finish(&mut self, stage: Stage, started: Instant) {
		let elapsed = started.elapsed();

		self.stages.push(StageSpan {
			stage,
			started_at: self.wall_anchor + started.duration_since(self.anchor),
			elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
		});

		tracing::debug!(
			trace_id = %self.trace_id,
			stage = stage.as_str(),
			elapsed_ms = elapsed.as_millis() as u64,
			"Search stage finished."
		);
	}

	fn total_ms(&self) -> u64 {
		self.anchor.elapsed().as_millis() as u64
	}

	fn into_trace(self) -> SearchTrace {
		SearchTrace { trace_id: self.trace_id, stages: self.stages }
	}
}

impl KgrService {
	/// Runs the full pipeline: classify, embed, vector search, expand, assemble and optionally
	/// compose. Stages run strictly in that order; expansion is skipped for exact queries. Any
	/// failure aborts the call with the failing stage attached and no partial result.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResult> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::invalid("query must not be empty."));
		}
		if req.timeout_ms == Some(0) {
			return Err(Error::invalid("timeout_ms must be greater than zero."));
		}

		let limit = self.resolve_limit(req.limit)?;
		let budget_ms = req.timeout_ms.or(self.cfg.search.timeout_ms);
		let mut clock = StageClock::start(budget_ms);
		let trace_id = clock.trace_id;
		let outcome = self.run_pipeline(&mut clock, query, &req, limit).await;

		match outcome {
			Ok((query_type, entities, graph_data, context)) => {
				let elapsed_ms = clock.total_ms();

				tracing::info!(
					%trace_id,
					query_type = query_type.as_str(),
					mode_forced = req.mode.is_some(),
					hit_count = entities.len(),
					entity_count = graph_data.entities.len(),
					relation_count = graph_data.relationships.len(),
					elapsed_ms,
					"Search finished."
				);

				Ok(SearchResult {
					query_type,
					mode_forced: req.mode.is_some(),
					entities,
					graph_data,
					context,
					trace: clock.into_trace(),
				})
			},
			Err(err) => {
				tracing::warn!(
					%trace_id,
					stage = err.stage().map(Stage::as_str),
					retryable = err.is_retryable(),
					error = %err,
					elapsed_ms = clock.total_ms(),
					"Search failed."
				);

				Err(err)
			},
		}
	}

	async fn run_pipeline(
		&self,
		clock: &mut StageClock,
		query: &str,
		req: &SearchRequest,
		limit: u32,
	) -> Result<(QueryType, Vec<SimilarityHit>, GraphData, Option<ContextPayload>)> {
		let query_type = match req.mode {
			Some(mode) => mode,
			None => clock.step(Stage::Classify, || classify(query))?,
		};
		let vector = clock.run(Stage::Embed, self.embed_query(query)).await?;
		let hits = clock
			.run(
				Stage::VectorSearch,
				self.vector_search(&vector, req.entity_types.as_deref(), Some(limit)),
			)
			.await?;
		let graph_data = if query_type.needs_graph() {
			let max_hops = SEARCH_MAX_HOPS;
			let seed_ids: Vec<String> = hits.iter().map(|hit| hit.entity.id.clone()).collect();
			let subgraph = clock.run(Stage::Expand, self.expand(&seed_ids, max_hops)).await?;

			clock.step(Stage::Assemble, || assemble(&hits, subgraph, max_hops))?
		} else {
			clock.step(Stage::Assemble, GraphData::default)?
		};
		let context = if req.compose_context {
			Some(clock.step(Stage::Compose, || {
				compose(query, query_type, &hits, &graph_data, &self.cfg.context)
			})?)
		} else {
			None
		};

		Ok((query_type, hits, graph_data, context))
	}

	async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
		let texts = [query.to_string()];
		let vectors = self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;
		let vector = vectors.into_iter().next().ok_or_else(|| Error::EmbeddingUnavailable {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::EmbeddingUnavailable {
				message: format!(
					"Embedding has {} dimensions; expected {}.",
					vector.len(),
					self.cfg.storage.qdrant.vector_dim
				),
			});
		}
		if vector.iter().any(|component| !component.is_finite()) {
			return Err(Error::EmbeddingUnavailable {
				message: "Embedding contains non-finite components.".to_string(),
			});
		}

		Ok(vector)
	}
}
