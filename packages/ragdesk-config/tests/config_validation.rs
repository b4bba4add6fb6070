use std::{
	collections::HashMap,
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use ragdesk_config::{Config, Line};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with<F>(edit: F) -> String
where
	F: FnOnce(&mut toml::Table),
{
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");

	edit(root);

	toml::to_string(&value).expect("Failed to render template config.")
}

fn table_mut<'a>(root: &'a mut toml::Table, path: &[&str]) -> &'a mut toml::Table {
	let mut current = root;

	for key in path {
		current = current
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{key}]."));
	}

	current
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("ragdesk_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> ragdesk_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = ragdesk_config::load_with_env(&path, |_| None);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_and_trims_api_base() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string())
		.expect("Sample config should be valid.");

	assert_eq!(cfg.providers.embedding.api_base, "http://localhost:11434");
	assert!(cfg.storage.postgres.read_only);
	assert!(cfg.line.is_none());
}

#[test]
fn query_section_defaults_when_missing() {
	let payload = sample_toml_with(|root| {
		root.remove("query");
	});
	let cfg = load_payload(payload).expect("Config without [query] should be valid.");

	assert_eq!(cfg.query.intent_examples_k, 3);
	assert_eq!(cfg.query.sql_examples_k, 2);
	assert_eq!(cfg.query.static_similarity_threshold, 0.6);
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let payload = sample_toml_with(|root| {
		table_mut(root, &["storage", "qdrant"]).insert("vector_dim".to_string(), Value::Integer(768));
	});
	let err = load_payload(payload).expect_err("Expected dimension mismatch error.");

	assert!(
		err.to_string()
			.contains("providers.embedding.dimensions must match storage.qdrant.vector_dim."),
		"Unexpected error: {err}"
	);
}

#[test]
fn similarity_threshold_must_be_a_ratio() {
	let mut cfg = base_config();

	cfg.query.static_similarity_threshold = 1.5;

	let err = ragdesk_config::validate(&cfg).expect_err("Expected threshold range error.");

	assert!(
		err.to_string().contains("query.static_similarity_threshold must be in the range 0.0-1.0."),
		"Unexpected error: {err}"
	);
}

#[test]
fn retrieval_counts_must_be_positive() {
	let mut cfg = base_config();

	cfg.query.schema_k = 0;

	let err = ragdesk_config::validate(&cfg).expect_err("Expected schema_k error.");

	assert!(err.to_string().contains("query.schema_k must be greater than zero."));
}

#[test]
fn collections_must_differ() {
	let mut cfg = base_config();

	cfg.storage.qdrant.example_collection = cfg.storage.qdrant.schema_collection.clone();

	assert!(ragdesk_config::validate(&cfg).is_err());
}

#[test]
fn line_loading_seconds_must_be_a_multiple_of_five() {
	let mut cfg = base_config();
	let mut line = Line::new("secret".to_string(), "token".to_string());

	line.loading_seconds = 7;
	cfg.line = Some(line);

	let err = ragdesk_config::validate(&cfg).expect_err("Expected loading_seconds error.");

	assert!(err.to_string().contains("line.loading_seconds"), "Unexpected error: {err}");
}

#[test]
fn ollama_host_overrides_both_providers() {
	let mut cfg = base_config();
	let vars = HashMap::from([("OLLAMA_HOST", "ollama"), ("OLLAMA_PORT", "11500")]);

	ragdesk_config::apply_env_overrides(&mut cfg, |key| vars.get(key).map(|v| v.to_string()));

	assert_eq!(cfg.providers.llm.api_base, "http://ollama:11500");
	assert_eq!(cfg.providers.embedding.api_base, "http://ollama:11500");
}

#[test]
fn localhost_ollama_host_keeps_configured_base() {
	let mut cfg = base_config();
	let vars = HashMap::from([("OLLAMA_HOST", "localhost")]);

	ragdesk_config::apply_env_overrides(&mut cfg, |key| vars.get(key).map(|v| v.to_string()));

	assert_eq!(cfg.providers.llm.api_base, "http://localhost:11434");
}

#[test]
fn line_credentials_from_env_create_section() {
	let mut cfg = base_config();
	let vars = HashMap::from([
		("LINE_CHANNEL_SECRET", "channel-secret"),
		("LINE_CHANNEL_ACCESS_TOKEN", "channel-token"),
	]);

	ragdesk_config::apply_env_overrides(&mut cfg, |key| vars.get(key).map(|v| v.to_string()));

	let line = cfg.line.as_ref().expect("LINE section should be created.");

	assert_eq!(line.channel_secret, "channel-secret");
	assert_eq!(line.api_base, "https://api.line.me");
	assert!(ragdesk_config::validate(&cfg).is_ok());
}

#[test]
fn partial_line_credentials_do_not_create_section() {
	let mut cfg = base_config();
	let vars = HashMap::from([("LINE_CHANNEL_SECRET", "channel-secret")]);

	ragdesk_config::apply_env_overrides(&mut cfg, |key| vars.get(key).map(|v| v.to_string()));

	assert!(cfg.line.is_none());
}

#[test]
fn load_reads_overrides_only_through_the_given_lookup() {
	let vars = HashMap::from([
		("OLLAMA_HOST", "ollama"),
		("LINE_CHANNEL_SECRET", "channel-secret"),
		("LINE_CHANNEL_ACCESS_TOKEN", "channel-token"),
	]);
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let overridden = ragdesk_config::load_with_env(&path, |key| vars.get(key).map(|v| v.to_string()))
		.expect("Config with env overrides should be valid.");
	let isolated =
		ragdesk_config::load_with_env(&path, |_| None).expect("Sample config should be valid.");

	fs::remove_file(&path).expect("Failed to remove test config.");

	assert_eq!(overridden.providers.embedding.api_base, "http://ollama:11434");
	assert_eq!(overridden.providers.llm.api_base, "http://ollama:11434");
	assert!(overridden.line.is_some());
	assert_eq!(isolated.providers.embedding.api_base, "http://localhost:11434");
	assert!(isolated.line.is_none());
}
