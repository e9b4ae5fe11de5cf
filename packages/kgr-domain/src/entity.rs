use std::{collections::BTreeSet, convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Properties = Map<String, Value>;

/// Node label in the knowledge graph. Labels outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
	Drug,
	Disease,
	ClinicalDisease,
	Protein,
	Gene,
	Pathway,
	Other(String),
}
impl EntityType {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Drug => "Drug",
			Self::Disease => "Disease",
			Self::ClinicalDisease => "ClinicalDisease",
			Self::Protein => "Protein",
			Self::Gene => "Gene",
			Self::Pathway => "Pathway",
			Self::Other(label) => label.as_str(),
		}
	}

	pub fn from_label(label: &str) -> Self {
		match label {
			"Drug" => Self::Drug,
			"Disease" => Self::Disease,
			"ClinicalDisease" => Self::ClinicalDisease,
			"Protein" => Self::Protein,
			"Gene" => Self::Gene,
			"Pathway" => Self::Pathway,
			other => Self::Other(other.to_string()),
		}
	}

	pub fn is_known(&self) -> bool {
		!matches!(self, Self::Other(_))
	}

	/// Picks the entity type from a store label list: the first known label wins, otherwise the
	/// first label. Returns `None` when there are no usable labels.
	pub fn from_labels<S>(labels: &[S]) -> Option<Self>
	where
		S: AsRef<str>,
	{
		let mut fallback = None;

		for label in labels.iter().map(AsRef::as_ref).map(str::trim) {
			if label.is_empty() {
				continue;
			}

			let entity_type = Self::from_label(label);

			if entity_type.is_known() {
				return Some(entity_type);
			}
			if fallback.is_none() {
				fallback = Some(entity_type);
			}
		}

		fallback
	}
}
impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for EntityType {
	type Err = Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::from_label(s))
	}
}
impl From<String> for EntityType {
	fn from(value: String) -> Self {
		Self::from_label(&value)
	}
}
impl From<EntityType> for String {
	fn from(value: EntityType) -> Self {
		match value {
			EntityType::Other(label) => label,
			known => known.as_str().to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
	pub id: String,
	pub entity_type: EntityType,
	pub display_name: String,
	#[serde(default)]
	pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityHit {
	pub entity: Entity,
	/// Cosine similarity mapped into `[0, 1]`.
	pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEdge {
	pub id: String,
	#[serde(rename = "type")]
	pub relation_type: String,
	pub from_entity_id: String,
	pub to_entity_id: String,
	#[serde(default)]
	pub properties: Properties,
}

/// Entities and relations reached by one expansion, each unique by ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
	pub entities: Vec<Entity>,
	#[serde(rename = "relationships")]
	pub edges: Vec<RelationEdge>,
}
impl Subgraph {
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty() && self.edges.is_empty()
	}

	pub fn entity(&self, id: &str) -> Option<&Entity> {
		self.entities.iter().find(|entity| entity.id == id)
	}

	pub fn entity_ids(&self) -> BTreeSet<&str> {
		self.entities.iter().map(|entity| entity.id.as_str()).collect()
	}

	pub fn edge_ids(&self) -> BTreeSet<&str> {
		self.edges.iter().map(|edge| edge.id.as_str()).collect()
	}

	/// Set equality over entity and relation IDs, ignoring iteration order.
	pub fn same_members(&self, other: &Self) -> bool {
		self.entity_ids() == other.entity_ids() && self.edge_ids() == other.edge_ids()
	}
}
