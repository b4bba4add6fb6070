use std::collections::HashMap;

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, Query, QueryPointsBuilder,
		UpsertPointsBuilder, Value, VectorParamsBuilder, value::Kind,
	},
};
use uuid::Uuid;

use crate::{Result, Row};

pub struct QdrantStore {
	pub client: Qdrant,
	pub schema_collection: String,
	pub example_collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &ragdesk_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			schema_collection: cfg.schema_collection.clone(),
			example_collection: cfg.example_collection.clone(),
			vector_dim: cfg.vector_dim,
		})
	}

	/// Creates the collection with cosine distance when it does not exist yet. Returns whether it
	/// was created.
	pub async fn ensure_collection(&self, collection: &str) -> Result<bool> {
		let existing = self.client.list_collections().await?;

		if existing.collections.iter().any(|c| c.name == collection) {
			return Ok(false);
		}

		let builder = CreateCollectionBuilder::new(collection.to_string())
			.vectors_config(VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine));

		self.client.create_collection(builder).await?;

		Ok(true)
	}

	pub async fn upsert(
		&self,
		collection: &str,
		id: Uuid,
		vector: Vec<f32>,
		payload: Row,
	) -> Result<()> {
		let mut point_payload = Payload::new();

		for (key, value) in payload {
			point_payload.insert(key, value);
		}

		let point = PointStruct::new(id.to_string(), vector, point_payload);

		self.client
			.upsert_points(UpsertPointsBuilder::new(collection.to_string(), vec![point]).wait(true))
			.await?;

		Ok(())
	}

	/// Nearest-neighbour search. Hits come back best first, each with its score and payload.
	pub async fn search(
		&self,
		collection: &str,
		vector: Vec<f32>,
		limit: u32,
	) -> Result<Vec<(f32, Row)>> {
		let search = QueryPointsBuilder::new(collection.to_string())
			.query(Query::new_nearest(vector))
			.with_payload(true)
			.limit(limit as u64);
		let response = self.client.query(search).await?;

		Ok(response
			.result
			.into_iter()
			.map(|point| (point.score, payload_to_row(point.payload)))
			.collect())
	}
}

pub fn payload_to_row(payload: HashMap<String, Value>) -> Row {
	payload.into_iter().map(|(key, value)| (key, value_to_json(value))).collect()
}

fn value_to_json(value: Value) -> serde_json::Value {
	match value.kind {
		Some(Kind::BoolValue(flag)) => serde_json::Value::Bool(flag),
		Some(Kind::IntegerValue(number)) => serde_json::Value::from(number),
		Some(Kind::DoubleValue(number)) => serde_json::Number::from_f64(number)
			.map(serde_json::Value::Number)
			.unwrap_or(serde_json::Value::Null),
		Some(Kind::StringValue(text)) => serde_json::Value::String(text),
		Some(Kind::ListValue(list)) =>
			serde_json::Value::Array(list.values.into_iter().map(value_to_json).collect()),
		Some(Kind::StructValue(object)) => serde_json::Value::Object(
			object.fields.into_iter().map(|(key, value)| (key, value_to_json(value))).collect(),
		),
		Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
	}
}
