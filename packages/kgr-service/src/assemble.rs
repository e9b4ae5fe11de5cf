use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use kgr_domain::{Entity, RelationEdge, SimilarityHit, Subgraph, traversal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	/// The `from` endpoint is at least as close to a seed as the `to` endpoint.
	Outgoing,
	Incoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntity {
	#[serde(flatten)]
	pub entity: Entity,
	pub hop: u32,
	/// Similarity score when the entity was also a vector hit.
	pub relevance: Option<f64>,
	pub seed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelation {
	#[serde(flatten)]
	pub edge: RelationEdge,
	pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	pub entities: Vec<GraphEntity>,
	pub relationships: Vec<GraphRelation>,
}
impl GraphData {
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty() && self.relationships.is_empty()
	}

	pub fn entity(&self, id: &str) -> Option<&GraphEntity> {
		self.entities.iter().find(|member| member.entity.id == id)
	}
}

/// Annotates an expansion around `hits` for the caller.
///
/// Seeds come first in hit order, followed by the rest of the subgraph ordered by hop then ID.
/// Every hit appears as a seed even when the store did not return it.
pub fn assemble(hits: &[SimilarityHit], subgraph: Subgraph, max_hops: u32) -> GraphData {
	let seeds = hits.iter().map(|hit| hit.entity.id.as_str());
	let distances = traversal::hop_distances(seeds, &subgraph.edges, max_hops);
	let mut fetched: HashMap<String, Entity> =
		subgraph.entities.into_iter().map(|entity| (entity.id.clone(), entity)).collect();
	let mut entities = Vec::with_capacity(fetched.len() + hits.len());
	let mut placed = HashSet::new();

	for hit in hits {
		if !placed.insert(hit.entity.id.clone()) {
			continue;
		}

		let entity = fetched.remove(&hit.entity.id).unwrap_or_else(|| hit.entity.clone());

		entities.push(GraphEntity { entity, hop: 0, relevance: Some(hit.score), seed: true });
	}

	let mut rest: Vec<GraphEntity> = fetched
		.into_values()
		.map(|entity| GraphEntity {
			hop: distances.get(&entity.id).copied().unwrap_or(max_hops),
			relevance: None,
			seed: false,
			entity,
		})
		.collect();

	rest.sort_by(|a, b| a.hop.cmp(&b.hop).then_with(|| a.entity.id.cmp(&b.entity.id)));
	entities.extend(rest);

	let relationships = subgraph
		.edges
		.into_iter()
		.map(|edge| {
			let from_hop = distances.get(&edge.from_entity_id).copied().unwrap_or(u32::MAX);
			let to_hop = distances.get(&edge.to_entity_id).copied().unwrap_or(u32::MAX);
			let direction =
				if from_hop <= to_hop { Direction::Outgoing } else { Direction::Incoming };

			GraphRelation { edge, direction }
		})
		.collect();

	GraphData { entities, relationships }
}
