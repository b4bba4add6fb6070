use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

use ragdesk_config::EmbeddingProviderConfig;
use ragdesk_domain::records::{ExampleMatch, ExampleRecord, SchemaMatch, SchemaRecord};
use ragdesk_storage::{Row, qdrant::QdrantStore};

use crate::{BoxFuture, EmbeddingProvider, Error, KnowledgeBase, Result};

/// Payload key holding the text that was embedded for the point.
pub const DOCUMENT_KEY: &str = "document";

/// Knowledge base backed by two Qdrant collections and an embedding provider.
pub struct QdrantKnowledgeBase {
	qdrant: QdrantStore,
	embedding_cfg: EmbeddingProviderConfig,
	embedding: Arc<dyn EmbeddingProvider>,
}
impl QdrantKnowledgeBase {
	pub fn new(
		qdrant: QdrantStore,
		embedding_cfg: EmbeddingProviderConfig,
		embedding: Arc<dyn EmbeddingProvider>,
	) -> Self {
		Self { qdrant, embedding_cfg, embedding }
	}

	async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let texts = [text.to_string()];
		let vec = self
			.embedding
			.embed(&self.embedding_cfg, &texts)
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			})?;

		if vec.len() != self.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: format!(
					"Embedding has {} dimensions; the collections expect {}.",
					vec.len(),
					self.qdrant.vector_dim
				),
			});
		}

		Ok(vec)
	}

	async fn search_examples(&self, query: &str, limit: u32) -> Result<Vec<ExampleMatch>> {
		let vector = self.embed_one(query).await?;
		let hits = self.qdrant.search(&self.qdrant.example_collection, vector, limit).await?;

		hits.into_iter()
			.map(|(score, row)| Ok(ExampleMatch { record: decode_record(row)?, score }))
			.collect()
	}

	async fn search_schemas(&self, query: &str, limit: u32) -> Result<Vec<SchemaMatch>> {
		let vector = self.embed_one(query).await?;
		let hits = self.qdrant.search(&self.qdrant.schema_collection, vector, limit).await?;

		hits.into_iter()
			.map(|(score, row)| Ok(SchemaMatch { record: decode_record(row)?, score }))
			.collect()
	}

	async fn ensure(&self) -> Result<()> {
		for collection in [&self.qdrant.schema_collection, &self.qdrant.example_collection] {
			if self.qdrant.ensure_collection(collection).await? {
				tracing::info!(collection = %collection, "Qdrant collection created.");
			}
		}

		Ok(())
	}

	async fn store<T>(&self, collection: &str, id: Uuid, document: String, record: &T) -> Result<()>
	where
		T: Serialize + Sync,
	{
		let vector = self.embed_one(&document).await?;
		let mut payload = encode_record(record)?;

		payload.insert(DOCUMENT_KEY.to_string(), Value::String(document));

		self.qdrant.upsert(collection, id, vector, payload).await?;

		Ok(())
	}
}

impl KnowledgeBase for QdrantKnowledgeBase {
	fn search_similar_examples<'a>(
		&'a self,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ExampleMatch>>> {
		Box::pin(self.search_examples(query, limit))
	}

	fn search_relevant_schemas<'a>(
		&'a self,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<SchemaMatch>>> {
		Box::pin(self.search_schemas(query, limit))
	}

	fn ensure_collections<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.ensure())
	}

	fn add_schema<'a>(&'a self, schema: &'a SchemaRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.store(
			&self.qdrant.schema_collection,
			schema_point_id(schema),
			schema.to_text(),
			schema,
		))
	}

	fn add_example<'a>(&'a self, example: &'a ExampleRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.store(
			&self.qdrant.example_collection,
			example_point_id(example),
			example.to_text(),
			example,
		))
	}
}

/// Stable point id, so storing the same table twice overwrites the earlier point.
pub fn schema_point_id(schema: &SchemaRecord) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("schema:{}", schema.table_name).as_bytes())
}

pub fn example_point_id(example: &ExampleRecord) -> Uuid {
	Uuid::new_v5(
		&Uuid::NAMESPACE_OID,
		format!("example:{}:{}", example.intent, example.natural_query).as_bytes(),
	)
}

fn encode_record<T>(record: &T) -> Result<Row>
where
	T: Serialize,
{
	match serde_json::to_value(record) {
		Ok(Value::Object(map)) => Ok(map),
		Ok(_) => Err(Error::InvalidRequest {
			message: "Knowledge records must serialize to JSON objects.".to_string(),
		}),
		Err(err) => Err(Error::InvalidRequest { message: err.to_string() }),
	}
}

fn decode_record<T>(row: Row) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_json::from_value(Value::Object(row)).map_err(|err| Error::Qdrant {
		message: format!("Stored payload does not match the record shape: {err}."),
	})
}
