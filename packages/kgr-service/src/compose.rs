use std::{collections::HashSet, fmt::Write as _};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use kgr_domain::{Entity, EntityType, Properties, QueryType, SimilarityHit};

use crate::{Direction, GraphData};

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
	Hit,
	Graph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntity {
	pub id: String,
	pub name: String,
	pub entity_type: EntityType,
	pub properties: Properties,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub score: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hop: Option<u32>,
	pub source: EvidenceSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRelation {
	pub relation_type: String,
	pub from: String,
	pub to: String,
	pub direction: Direction,
}

/// Size-bounded evidence bundle handed to answer generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPayload {
	pub query: String,
	pub query_type: QueryType,
	pub entities: Vec<ContextEntity>,
	pub relations: Vec<ContextRelation>,
	/// Whether any graph-derived evidence made it into the payload.
	pub graph: bool,
	/// Whether any hit, graph entity, relation or property was dropped or clipped to stay within
	/// budget.
	pub truncated: bool,
}
impl ContextPayload {
	/// Plain-text rendering for a generation prompt.
	pub fn render(&self) -> String {
		let mut out = String::new();
		let _ = writeln!(out, "Query: {}", self.query);
		let _ = writeln!(out, "Strategy: {}", self.query_type);

		if !self.entities.is_empty() {
			out.push_str("Entities:\n");
		}

		for entity in &self.entities {
			let tag = match (entity.source, entity.score, entity.hop) {
				(EvidenceSource::Hit, Some(score), _) => format!("hit {score:.3}"),
				(EvidenceSource::Graph, _, Some(hop)) => format!("graph hop {hop}"),
				(EvidenceSource::Hit, ..) => "hit".to_string(),
				(EvidenceSource::Graph, ..) => "graph".to_string(),
			};
			let _ = write!(
				out,
				"- [{tag}] {} ({}, id {})",
				entity.name, entity.entity_type, entity.id
			);

			if !entity.properties.is_empty() {
				let _ = write!(out, " {}", Value::Object(entity.properties.clone()));
			}

			out.push('\n');
		}

		if !self.relations.is_empty() {
			out.push_str("Relations:\n");
		}

		for relation in &self.relations {
			let _ = writeln!(
				out,
				"- {} -[{}]-> {}",
				relation.from, relation.relation_type, relation.to
			);
		}

		if self.truncated {
			out.push_str("(context truncated)\n");
		}

		out
	}
}

/// Fits hits and graph evidence into the `context` budgets.
///
/// Hits and graph entities are budgeted separately, so graph evidence is never crowded out by
/// hits. An entity listed as a hit is not repeated as a graph entity, and relations are kept only
/// when both endpoints made it into the payload.
pub fn compose(
	query: &str,
	query_type: QueryType,
	hits: &[SimilarityHit],
	graph: &GraphData,
	budget: &kgr_config::Context,
) -> ContextPayload {
	let mut truncated = false;
	let mut listed: HashSet<&str> = HashSet::new();
	let mut entities = Vec::new();

	for hit in hits {
		if listed.contains(hit.entity.id.as_str()) {
			continue;
		}
		if listed.len() >= budget.max_hits as usize {
			truncated = true;

			break;
		}

		listed.insert(hit.entity.id.as_str());
		entities.push(context_entity(
			&hit.entity,
			Some(hit.score),
			None,
			EvidenceSource::Hit,
			budget,
			&mut truncated,
		));
	}

	let mut graph_entities = 0;

	for member in &graph.entities {
		if listed.contains(member.entity.id.as_str()) {
			continue;
		}
		if graph_entities >= budget.max_graph_entities as usize {
			truncated = true;

			break;
		}

		listed.insert(member.entity.id.as_str());
		graph_entities += 1;
		entities.push(context_entity(
			&member.entity,
			member.relevance,
			Some(member.hop),
			EvidenceSource::Graph,
			budget,
			&mut truncated,
		));
	}

	let mut relations = Vec::new();

	for relation in &graph.relationships {
		let edge = &relation.edge;

		if !listed.contains(edge.from_entity_id.as_str())
			|| !listed.contains(edge.to_entity_id.as_str())
		{
			truncated = true;

			continue;
		}
		if relations.len() >= budget.max_relations as usize {
			truncated = true;

			break;
		}

		relations.push(ContextRelation {
			relation_type: edge.relation_type.clone(),
			from: edge.from_entity_id.clone(),
			to: edge.to_entity_id.clone(),
			direction: relation.direction,
		});
	}

	ContextPayload {
		query: query.to_string(),
		query_type,
		graph: graph_entities > 0 || !relations.is_empty(),
		entities,
		relations,
		truncated,
	}
}

fn context_entity(
	entity: &Entity,
	score: Option<f64>,
	hop: Option<u32>,
	source: EvidenceSource,
	budget: &kgr_config::Context,
	truncated: &mut bool,
) -> ContextEntity {
	let properties = clip_properties(
		&entity.properties,
		budget.max_property_chars as usize,
		budget.max_entity_chars as usize,
		truncated,
	);

	ContextEntity {
		id: entity.id.clone(),
		name: entity.display_name.clone(),
		entity_type: entity.entity_type.clone(),
		properties,
		score,
		hop,
		source,
	}
}

/// Clips every property, then keeps properties in key order while their serialized size fits
/// `max_entity_chars`.
fn clip_properties(
	properties: &Properties,
	max_chars: usize,
	max_entity_chars: usize,
	truncated: &mut bool,
) -> Properties {
	let mut out = Properties::new();
	let mut used = 2;

	for (key, value) in properties {
		let value = clip_value(value, max_chars, truncated);
		// `"key":value,` in the serialized object.
		let size = Value::from(key.as_str()).to_string().len() + value.to_string().len() + 2;

		if used + size > max_entity_chars {
			*truncated = true;

			break;
		}

		used += size;

		out.insert(key.clone(), value);
	}

	out
}

fn clip_value(value: &Value, max_chars: usize, truncated: &mut bool) -> Value {
	match value {
		Value::String(text) => {
			let (text, cut) = clip(text, max_chars);

			*truncated |= cut;

			Value::String(text)
		},
		Value::Array(items) =>
			Value::Array(items.iter().map(|item| clip_value(item, max_chars, truncated)).collect()),
		Value::Object(map) => Value::Object(
			map.iter()
				.map(|(key, item)| (key.clone(), clip_value(item, max_chars, truncated)))
				.collect(),
		),
		other => other.clone(),
	}
}

/// Cuts `text` to `max_chars` characters on a char boundary, marking the cut with `...`. The flag
/// reports whether anything was cut.
fn clip(text: &str, max_chars: usize) -> (String, bool) {
	match text.char_indices().nth(max_chars) {
		Some((end, _)) => (format!("{}{ELLIPSIS}", &text[..end]), true),
		None => (text.to_string(), false),
	}
}
