pub const DENSE_VECTOR_NAME: &str = "dense";
pub const LABELS_FIELD: &str = "labels";

use std::collections::HashMap;

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
		Filter, PointStruct, Query, QueryPointsBuilder, ScoredPoint, UpsertPointsBuilder, Value,
		Vector, VectorParamsBuilder, VectorsConfigBuilder, value::Kind,
	},
};
use serde_json::{Map, Number};
use uuid::Uuid;

use crate::{Error, Result, models::EntityRow};

/// One vector hit, with the cosine similarity mapped into `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ScoredEntity {
	pub entity: EntityRow,
	pub score: f64,
}

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &kgr_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the entity collection and its label index when the collection is missing.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(vectors_config),
			)
			.await?;
		self.client
			.create_field_index(
				CreateFieldIndexCollectionBuilder::new(
					self.collection.clone(),
					LABELS_FIELD,
					FieldType::Keyword,
				)
				.wait(true),
			)
			.await?;

		tracing::info!(collection = %self.collection, "Qdrant collection created.");

		Ok(())
	}

	/// Nearest neighbours of `vector`, best first. An empty `entity_types` means no label filter.
	pub async fn similarity_search(
		&self,
		vector: &[f32],
		entity_types: &[String],
		limit: u32,
	) -> Result<Vec<ScoredEntity>> {
		self.check_dim(vector)?;

		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.using(DENSE_VECTOR_NAME)
			.with_payload(true)
			.limit(u64::from(limit));

		if !entity_types.is_empty() {
			search =
				search.filter(Filter::must([Condition::matches(LABELS_FIELD, entity_types.to_vec())]));
		}

		let response = self.client.query(search).await?;

		response.result.into_iter().map(scored_entity).collect()
	}

	/// Writes one point per entity, keyed by a UUIDv5 of the entity ID so re-indexing overwrites.
	pub async fn upsert_entity_vectors(&self, entries: &[(EntityRow, Vec<f32>)]) -> Result<()> {
		if entries.is_empty() {
			return Ok(());
		}

		let mut points = Vec::with_capacity(entries.len());

		for (entity, vector) in entries {
			self.check_dim(vector)?;

			let payload = Payload::try_from(serde_json::json!({
				"entity_id": entity.entity_id,
				"entity_type": entity.labels.first(),
				"labels": entity.labels,
				"display_name": entity.display_name,
				"properties": entity.properties,
			}))?;
			let mut vectors = HashMap::new();

			vectors.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vector.clone()));

			points.push(PointStruct::new(point_id(&entity.entity_id).to_string(), vectors, payload));
		}

		let count = points.len();

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
			.await?;

		tracing::debug!(collection = %self.collection, count, "Entity vectors upserted.");

		Ok(())
	}

	fn check_dim(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"vector has {} dimensions, collection expects {}",
				vector.len(),
				self.vector_dim
			)));
		}

		Ok(())
	}
}

pub fn point_id(entity_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, entity_id.as_bytes())
}

/// Maps a cosine similarity in `[-1, 1]` onto `[0, 1]`. Non-finite input stays non-finite.
pub fn normalize_score(raw: f32) -> f64 {
	((1.0 + f64::from(raw)) / 2.0).clamp(0.0, 1.0)
}

fn scored_entity(point: ScoredPoint) -> Result<ScoredEntity> {
	let payload = point.payload;
	let entity_id = payload_string(&payload, "entity_id")
		.ok_or_else(|| Error::Malformed("point payload is missing entity_id".to_string()))?;
	let mut labels = payload_strings(&payload, LABELS_FIELD);

	if labels.is_empty() {
		labels.extend(payload_string(&payload, "entity_type"));
	}

	let display_name = payload_string(&payload, "display_name").unwrap_or_else(|| entity_id.clone());
	let properties = match payload.get("properties").map(to_json) {
		Some(serde_json::Value::Object(map)) => serde_json::Value::Object(map),
		Some(serde_json::Value::Null) | None => serde_json::Value::Object(Map::new()),
		Some(_) => {
			return Err(Error::Malformed(format!(
				"properties of entity {entity_id} must be an object"
			)));
		},
	};

	Ok(ScoredEntity {
		entity: EntityRow { entity_id, labels, display_name, properties },
		score: normalize_score(point.score),
	})
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match payload.get(key)?.kind.as_ref()? {
		Kind::StringValue(text) if !text.trim().is_empty() => Some(text.clone()),
		_ => None,
	}
}

fn payload_strings(payload: &HashMap<String, Value>, key: &str) -> Vec<String> {
	match payload.get(key).and_then(|value| value.kind.as_ref()) {
		Some(Kind::ListValue(list)) => list
			.values
			.iter()
			.filter_map(|value| match value.kind.as_ref() {
				Some(Kind::StringValue(text)) => Some(text.clone()),
				_ => None,
			})
			.collect(),
		Some(Kind::StringValue(text)) => vec![text.clone()],
		_ => Vec::new(),
	}
}

fn to_json(value: &Value) -> serde_json::Value {
	match value.kind.as_ref() {
		None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
		Some(Kind::BoolValue(flag)) => serde_json::Value::Bool(*flag),
		Some(Kind::IntegerValue(number)) => serde_json::Value::Number((*number).into()),
		Some(Kind::DoubleValue(number)) =>
			Number::from_f64(*number).map(serde_json::Value::Number).unwrap_or_default(),
		Some(Kind::StringValue(text)) => serde_json::Value::String(text.clone()),
		Some(Kind::ListValue(list)) =>
			serde_json::Value::Array(list.values.iter().map(to_json).collect()),
		Some(Kind::StructValue(object)) => serde_json::Value::Object(
			object.fields.iter().map(|(key, value)| (key.clone(), to_json(value))).collect(),
		),
	}
}
