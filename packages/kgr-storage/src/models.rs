use serde_json::Value;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntityRow {
	pub entity_id: String,
	pub labels: Vec<String>,
	pub display_name: String,
	pub properties: Value,
}

/// An entity reached by a traversal, with its minimum hop distance from any seed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReachedEntity {
	#[sqlx(flatten)]
	pub entity: EntityRow,
	pub hop: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RelationRow {
	pub relation_id: String,
	pub relation_type: String,
	pub from_entity_id: String,
	pub to_entity_id: String,
	pub properties: Value,
}
