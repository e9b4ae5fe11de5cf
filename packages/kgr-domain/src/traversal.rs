use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::{Entity, Error, RelationEdge, Result, Subgraph};

/// Undirected BFS over `edges` from every seed. Returns the minimum hop count of each entity
/// reached within `max_hops`, seeds included at hop 0.
pub fn hop_distances<'a, I>(
	seeds: I,
	edges: &'a [RelationEdge],
	max_hops: u32,
) -> HashMap<String, u32>
where
	I: IntoIterator<Item = &'a str>,
{
	let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

	for edge in edges {
		adjacency.entry(edge.from_entity_id.as_str()).or_default().push(edge.to_entity_id.as_str());
		adjacency.entry(edge.to_entity_id.as_str()).or_default().push(edge.from_entity_id.as_str());
	}

	let mut distances: HashMap<String, u32> = HashMap::new();
	let mut frontier: Vec<&str> = Vec::new();

	for seed in seeds {
		if distances.insert(seed.to_string(), 0).is_none() {
			frontier.push(seed);
		}
	}

	let mut hop = 0;

	while hop < max_hops && !frontier.is_empty() {
		hop += 1;

		let mut next = Vec::new();

		for node in frontier {
			let Some(neighbors) = adjacency.get(node) else {
				continue;
			};

			for neighbor in neighbors {
				if !distances.contains_key(*neighbor) {
					distances.insert((*neighbor).to_string(), hop);
					next.push(*neighbor);
				}
			}
		}

		frontier = next;
	}

	distances
}

/// Whether a relation is one of the first `max_hops` steps away from the seeds, given the hop
/// distances of its endpoints.
pub fn edge_within(from_hop: u32, to_hop: u32, max_hops: u32) -> bool {
	from_hop.min(to_hop) < max_hops && from_hop.max(to_hop) <= max_hops
}

/// Clips a raw traversal answer to the hop radius around `seeds`.
///
/// Entities and relations are deduplicated by ID (first occurrence wins). Hop distances are
/// re-derived from the relations themselves, so anything the store returned beyond `max_hops`, or
/// not connected to a seed at all, is dropped. With `max_entities`, the nearest entities are kept
/// (ordered by hop, then ID) and relations touching a dropped entity go with it.
///
/// A relation whose endpoint is missing from the entity list is rejected as malformed input.
pub fn bound_subgraph(
	seeds: &BTreeSet<String>,
	raw: Subgraph,
	max_hops: u32,
	max_entities: Option<usize>,
) -> Result<Subgraph> {
	let entities = dedup_entities(raw.entities);
	let edges = dedup_edges(raw.edges);
	let known: HashSet<&str> = entities.keys().map(String::as_str).collect();

	for edge in &edges {
		for endpoint in [&edge.from_entity_id, &edge.to_entity_id] {
			if !known.contains(endpoint.as_str()) {
				return Err(Error::DanglingRelation {
					relation_id: edge.id.clone(),
					entity_id: endpoint.clone(),
				});
			}
		}
	}

	let distances = hop_distances(seeds.iter().map(String::as_str), &edges, max_hops);
	let mut ranked: Vec<(u32, Entity)> = entities
		.into_values()
		.filter_map(|entity| distances.get(&entity.id).map(|hop| (*hop, entity)))
		.collect();

	ranked.sort_by(|(hop_a, a), (hop_b, b)| hop_a.cmp(hop_b).then_with(|| a.id.cmp(&b.id)));

	if let Some(cap) = max_entities {
		ranked.truncate(cap);
	}

	let kept: HashMap<&str, u32> =
		ranked.iter().map(|(hop, entity)| (entity.id.as_str(), *hop)).collect();
	let mut kept_edges: Vec<RelationEdge> = edges
		.iter()
		.filter(|edge| {
			match (kept.get(edge.from_entity_id.as_str()), kept.get(edge.to_entity_id.as_str())) {
				(Some(from_hop), Some(to_hop)) => edge_within(*from_hop, *to_hop, max_hops),
				_ => false,
			}
		})
		.cloned()
		.collect();

	kept_edges.sort_by(|a, b| a.id.cmp(&b.id));

	let entities = ranked.into_iter().map(|(_, entity)| entity).collect();

	Ok(Subgraph { entities, edges: kept_edges })
}

fn dedup_entities(entities: Vec<Entity>) -> BTreeMap<String, Entity> {
	let mut out = BTreeMap::new();

	for entity in entities {
		out.entry(entity.id.clone()).or_insert(entity);
	}

	out
}

fn dedup_edges(edges: Vec<RelationEdge>) -> Vec<RelationEdge> {
	let mut seen = HashSet::new();

	edges.into_iter().filter(|edge| seen.insert(edge.id.clone())).collect()
}
