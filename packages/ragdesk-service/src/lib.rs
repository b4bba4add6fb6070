pub mod executor;
pub mod intent;
pub mod knowledge;
pub mod prompts;
pub mod query;
pub mod respond;
pub mod seed;
pub mod sql;
pub mod static_response;

mod error;

pub use error::{Error, Result};
pub use executor::PgQueryExecutor;
pub use knowledge::QdrantKnowledgeBase;
pub use query::QueryResult;
pub use seed::{SeedData, SeedReport};

use std::{future::Future, pin::Pin, sync::Arc};

use ragdesk_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use ragdesk_domain::records::{ExampleMatch, ExampleRecord, SchemaMatch, SchemaRecord};
use ragdesk_providers::{embedding, llm};
use ragdesk_storage::{Row, db::Db, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Vector retrieval over the schema and example collections.
pub trait KnowledgeBase
where
	Self: Send + Sync,
{
	/// Most similar examples first.
	fn search_similar_examples<'a>(
		&'a self,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ExampleMatch>>>;

	/// Most relevant schemas first.
	fn search_relevant_schemas<'a>(
		&'a self,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<SchemaMatch>>>;

	fn ensure_collections<'a>(&'a self) -> BoxFuture<'a, Result<()>>;

	fn add_schema<'a>(&'a self, schema: &'a SchemaRecord) -> BoxFuture<'a, Result<()>>;

	fn add_example<'a>(&'a self, example: &'a ExampleRecord) -> BoxFuture<'a, Result<()>>;
}

pub trait LlmProvider
where
	Self: Send + Sync,
{
	fn chat<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Runs a statement that already passed the safety gate.
pub trait QueryExecutor
where
	Self: Send + Sync,
{
	fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<Vec<Row>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub llm: Arc<dyn LlmProvider>,
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(llm: Arc<dyn LlmProvider>, embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { llm, embedding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { llm: provider.clone(), embedding: provider }
	}
}

/// The query engine. Cheap to share behind an `Arc`; every call keeps its state local.
pub struct RagService {
	pub cfg: Config,
	pub knowledge: Arc<dyn KnowledgeBase>,
	pub executor: Arc<dyn QueryExecutor>,
	pub providers: Providers,
}
impl RagService {
	/// Wires the Postgres executor and the Qdrant knowledge base with the HTTP providers.
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		let providers = Providers::default();
		let knowledge = QdrantKnowledgeBase::new(
			qdrant,
			cfg.providers.embedding.clone(),
			providers.embedding.clone(),
		);
		let executor = PgQueryExecutor::new(db, cfg.storage.postgres.read_only);

		Self { cfg, knowledge: Arc::new(knowledge), executor: Arc::new(executor), providers }
	}

	pub fn with_parts(
		cfg: Config,
		knowledge: Arc<dyn KnowledgeBase>,
		executor: Arc<dyn QueryExecutor>,
		providers: Providers,
	) -> Self {
		Self { cfg, knowledge, executor, providers }
	}
}

struct DefaultProviders;

impl LlmProvider for DefaultProviders {
	fn chat<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(llm::chat(cfg, prompt).await?) })
	}
}

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
