use std::collections::BTreeSet;

use tokio::time::Instant;

use kgr_domain::{Subgraph, traversal};

use crate::{Error, KgrService, Result, Stage, records};

impl KgrService {
	/// Entities and relations within `max_hops` of any seed, seeds included.
	///
	/// Hop distances are recomputed from the store's answer, so nothing past the radius survives
	/// even if the store over-fetches. An empty seed set returns an empty subgraph without a store
	/// round trip.
	pub async fn expand(&self, seed_ids: &[String], max_hops: u32) -> Result<Subgraph> {
		if !(1..=2).contains(&max_hops) {
			return Err(Error::invalid(format!("max_hops must be 1 or 2, got {max_hops}.")));
		}
		if seed_ids.iter().any(|id| id.trim().is_empty()) {
			return Err(Error::invalid("seed ids must not be empty."));
		}

		let seeds: BTreeSet<String> = seed_ids.iter().map(|id| id.trim().to_string()).collect();

		if seeds.is_empty() {
			return Ok(Subgraph::default());
		}

		let started = Instant::now();
		let seed_list: Vec<String> = seeds.iter().cloned().collect();
		let raw = self.providers.graph.traverse(&seed_list, max_hops).await?;
		let mut fetched = Subgraph::default();

		for reached in raw.entities {
			fetched.entities.push(records::entity(Stage::Expand, reached.entity)?);
		}
		for relation in raw.relations {
			fetched.edges.push(records::edge(Stage::Expand, relation)?);
		}

		let fetched_entities = fetched.entities.len();
		let cap = self.cfg.search.expansion.max_entities.map(|cap| cap as usize);
		let subgraph = traversal::bound_subgraph(&seeds, fetched, max_hops, cap)
			.map_err(|err| Error::malformed(Stage::Expand, err.to_string()))?;

		tracing::debug!(
			stage = Stage::Expand.as_str(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			seed_count = seeds.len(),
			max_hops,
			fetched_entities,
			entity_count = subgraph.entities.len(),
			relation_count = subgraph.edges.len(),
			"Graph expansion finished."
		);

		Ok(subgraph)
	}
}
