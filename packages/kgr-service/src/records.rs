use serde_json::Value;

use kgr_domain::{Entity, EntityType, Properties, RelationEdge};
use kgr_storage::models::{EntityRow, RelationRow};

use crate::{Error, Result, Stage};

pub(crate) fn entity(stage: Stage, row: EntityRow) -> Result<Entity> {
	let id = row.entity_id.trim();

	if id.is_empty() {
		return Err(Error::malformed(stage, "entity record has an empty id."));
	}

	let entity_type = EntityType::from_labels(&row.labels)
		.ok_or_else(|| Error::malformed(stage, format!("entity {id} has no labels.")))?;
	let properties = properties(stage, id, row.properties)?;
	let display_name = if row.display_name.trim().is_empty() {
		id.to_string()
	} else {
		row.display_name
	};

	Ok(Entity { id: id.to_string(), entity_type, display_name, properties })
}

pub(crate) fn edge(stage: Stage, row: RelationRow) -> Result<RelationEdge> {
	let id = row.relation_id.trim();

	if id.is_empty() {
		return Err(Error::malformed(stage, "relation record has an empty id."));
	}
	if row.relation_type.trim().is_empty() {
		return Err(Error::malformed(stage, format!("relation {id} has no type.")));
	}
	if row.from_entity_id.trim().is_empty() || row.to_entity_id.trim().is_empty() {
		return Err(Error::malformed(stage, format!("relation {id} is missing an endpoint.")));
	}

	let properties = properties(stage, id, row.properties)?;

	Ok(RelationEdge {
		id: id.to_string(),
		relation_type: row.relation_type,
		from_entity_id: row.from_entity_id,
		to_entity_id: row.to_entity_id,
		properties,
	})
}

fn properties(stage: Stage, owner: &str, value: Value) -> Result<Properties> {
	match value {
		Value::Object(map) => Ok(map),
		Value::Null => Ok(Properties::new()),
		_ => Err(Error::malformed(stage, format!("properties of {owner} must be an object."))),
	}
}
