use sqlx::PgConnection;

use crate::{
	Error, Result,
	models::{EntityRow, ReachedEntity, RelationRow},
};

/// Raw neighborhood of a seed set as stored in Postgres.
#[derive(Debug, Default)]
pub struct Traversal {
	pub entities: Vec<ReachedEntity>,
	pub relations: Vec<RelationRow>,
}

/// Walks relations in both directions from `seed_ids` up to `max_hops` steps.
///
/// Entities come back with their minimum hop distance, seeds at hop 0, ordered by hop then ID.
/// Relations are those with one endpoint strictly inside the radius and the other reached, ordered
/// by ID. Seed IDs that do not exist are ignored.
pub async fn traverse(
	executor: &mut PgConnection,
	seed_ids: &[String],
	max_hops: u32,
) -> Result<Traversal> {
	if seed_ids.is_empty() {
		return Ok(Traversal::default());
	}

	let max_hops = i32::try_from(max_hops)
		.map_err(|_| Error::InvalidArgument("max_hops is out of range".to_string()))?;
	let entities = sqlx::query_as::<_, ReachedEntity>(
		"\
WITH RECURSIVE walk(entity_id, hop) AS (
	SELECT entity_id, 0
	FROM kg_entities
	WHERE entity_id = ANY($1::text[])
	UNION
	SELECT
		CASE WHEN r.from_entity_id = w.entity_id THEN r.to_entity_id ELSE r.from_entity_id END,
		w.hop + 1
	FROM walk w
	JOIN kg_relations r ON r.from_entity_id = w.entity_id OR r.to_entity_id = w.entity_id
	WHERE w.hop < $2
),
reach AS (
	SELECT entity_id, MIN(hop) AS hop
	FROM walk
	GROUP BY entity_id
)
SELECT
	e.entity_id,
	e.labels,
	e.display_name,
	e.properties,
	reach.hop
FROM reach
JOIN kg_entities e ON e.entity_id = reach.entity_id
ORDER BY reach.hop, e.entity_id",
	)
	.bind(seed_ids)
	.bind(max_hops)
	.fetch_all(&mut *executor)
	.await?;
	let inner: Vec<String> = entities
		.iter()
		.filter(|reached| reached.hop < max_hops)
		.map(|reached| reached.entity.entity_id.clone())
		.collect();
	let reached: Vec<String> =
		entities.iter().map(|reached| reached.entity.entity_id.clone()).collect();
	let relations = sqlx::query_as::<_, RelationRow>(
		"\
SELECT
	relation_id,
	relation_type,
	from_entity_id,
	to_entity_id,
	properties
FROM kg_relations
WHERE (from_entity_id = ANY($1::text[]) AND to_entity_id = ANY($2::text[]))
	OR (to_entity_id = ANY($1::text[]) AND from_entity_id = ANY($2::text[]))
ORDER BY relation_id",
	)
	.bind(&inner)
	.bind(&reached)
	.fetch_all(&mut *executor)
	.await?;

	Ok(Traversal { entities, relations })
}

pub async fn upsert_entity(executor: &mut PgConnection, row: &EntityRow) -> Result<()> {
	if row.entity_id.trim().is_empty() {
		return Err(Error::InvalidArgument("entity_id must not be empty".to_string()));
	}

	sqlx::query(
		"\
INSERT INTO kg_entities (entity_id, labels, display_name, properties)
VALUES ($1, $2, $3, $4)
ON CONFLICT (entity_id) DO UPDATE
SET
	labels = EXCLUDED.labels,
	display_name = EXCLUDED.display_name,
	properties = EXCLUDED.properties,
	updated_at = now()",
	)
	.bind(row.entity_id.as_str())
	.bind(&row.labels)
	.bind(row.display_name.as_str())
	.bind(&row.properties)
	.execute(&mut *executor)
	.await?;

	Ok(())
}

pub async fn upsert_relation(executor: &mut PgConnection, row: &RelationRow) -> Result<()> {
	if row.relation_id.trim().is_empty() {
		return Err(Error::InvalidArgument("relation_id must not be empty".to_string()));
	}
	if row.relation_type.trim().is_empty() {
		return Err(Error::InvalidArgument("relation_type must not be empty".to_string()));
	}

	sqlx::query(
		"\
INSERT INTO kg_relations (relation_id, relation_type, from_entity_id, to_entity_id, properties)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (relation_id) DO UPDATE
SET
	relation_type = EXCLUDED.relation_type,
	from_entity_id = EXCLUDED.from_entity_id,
	to_entity_id = EXCLUDED.to_entity_id,
	properties = EXCLUDED.properties",
	)
	.bind(row.relation_id.as_str())
	.bind(row.relation_type.as_str())
	.bind(row.from_entity_id.as_str())
	.bind(row.to_entity_id.as_str())
	.bind(&row.properties)
	.execute(&mut *executor)
	.await?;

	Ok(())
}
