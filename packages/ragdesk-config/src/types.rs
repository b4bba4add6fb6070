use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub query: Query,
	pub line: Option<Line>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	/// Run generated statements inside a `READ ONLY` transaction.
	#[serde(default = "default_true")]
	pub read_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	#[serde(default = "default_schema_collection")]
	pub schema_collection: String,
	#[serde(default = "default_example_collection")]
	pub example_collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Empty for a local Ollama instance; sent as a bearer token otherwise.
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Query {
	/// Examples retrieved as in-context guidance for intent classification.
	pub intent_examples_k: u32,
	/// Examples scanned for a pre-authored answer.
	pub static_examples_k: u32,
	/// Token-set Jaccard score a static example must exceed.
	pub static_similarity_threshold: f32,
	pub schema_k: u32,
	pub sql_examples_k: u32,
	/// Rows handed to the language model when phrasing the answer.
	pub response_max_rows: u32,
}
impl Default for Query {
	fn default() -> Self {
		Self {
			intent_examples_k: 3,
			static_examples_k: 3,
			static_similarity_threshold: 0.6,
			schema_k: 3,
			sql_examples_k: 2,
			response_max_rows: 5,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Line {
	pub channel_secret: String,
	pub channel_access_token: String,
	#[serde(default = "default_line_api_base")]
	pub api_base: String,
	#[serde(default = "default_line_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_loading_seconds")]
	pub loading_seconds: u32,
}
impl Line {
	pub fn new(channel_secret: String, channel_access_token: String) -> Self {
		Self {
			channel_secret,
			channel_access_token,
			api_base: default_line_api_base(),
			timeout_ms: default_line_timeout_ms(),
			loading_seconds: default_loading_seconds(),
		}
	}
}

fn default_true() -> bool {
	true
}

fn default_schema_collection() -> String {
	"crm_schema".to_string()
}

fn default_example_collection() -> String {
	"query_examples".to_string()
}

fn default_line_api_base() -> String {
	"https://api.line.me".to_string()
}

fn default_line_timeout_ms() -> u64 {
	10_000
}

fn default_loading_seconds() -> u32 {
	20
}
