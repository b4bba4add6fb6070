mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Line, LlmProviderConfig, Postgres, Providers, Qdrant, Query,
	Service, Storage,
};

use std::{env, fs, path::Path};

const DEFAULT_OLLAMA_PORT: &str = "11434";

pub fn load(path: &Path) -> Result<Config> {
	load_with_env(path, |key| env::var(key).ok())
}

/// Same as [`load`], reading environment overrides through `lookup` instead of the process
/// environment.
pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Config>
where
	F: Fn(&str) -> Option<String>,
{
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	apply_env_overrides(&mut cfg, lookup);
	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

/// Applies `OLLAMA_HOST`/`OLLAMA_PORT` and the LINE channel credentials from the environment.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	if let Some(host) = lookup("OLLAMA_HOST").filter(|host| !host.trim().is_empty())
		&& host.trim() != "localhost"
	{
		let port = lookup("OLLAMA_PORT")
			.filter(|port| !port.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_OLLAMA_PORT.to_string());
		let api_base = format!("http://{}:{}", host.trim(), port.trim());

		cfg.providers.llm.api_base = api_base.clone();
		cfg.providers.embedding.api_base = api_base;
	}

	let secret = lookup("LINE_CHANNEL_SECRET").filter(|value| !value.trim().is_empty());
	let token = lookup("LINE_CHANNEL_ACCESS_TOKEN").filter(|value| !value.trim().is_empty());

	match cfg.line.as_mut() {
		Some(line) => {
			if let Some(secret) = secret {
				line.channel_secret = secret;
			}
			if let Some(token) = token {
				line.channel_access_token = token;
			}
		},
		None =>
			if let (Some(secret), Some(token)) = (secret, token) {
				cfg.line = Some(Line::new(secret, token));
			},
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	let qdrant = &cfg.storage.qdrant;

	if qdrant.schema_collection.trim().is_empty() || qdrant.example_collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant collection names must be non-empty.".to_string(),
		});
	}
	if qdrant.schema_collection == qdrant.example_collection {
		return Err(Error::Validation {
			message: "storage.qdrant.schema_collection and storage.qdrant.example_collection must differ."
				.to_string(),
		});
	}

	let llm = &cfg.providers.llm;

	if !llm.temperature.is_finite() || llm.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number, zero or greater."
				.to_string(),
		});
	}

	for (label, model) in [
		("providers.embedding.model", &cfg.providers.embedding.model),
		("providers.llm.model", &llm.model),
	] {
		if model.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	let query = &cfg.query;

	for (label, value) in [
		("query.intent_examples_k", query.intent_examples_k),
		("query.static_examples_k", query.static_examples_k),
		("query.schema_k", query.schema_k),
		("query.sql_examples_k", query.sql_examples_k),
		("query.response_max_rows", query.response_max_rows),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if !query.static_similarity_threshold.is_finite() {
		return Err(Error::Validation {
			message: "query.static_similarity_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&query.static_similarity_threshold) {
		return Err(Error::Validation {
			message: "query.static_similarity_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}

	if let Some(line) = cfg.line.as_ref() {
		for (label, value) in [
			("line.channel_secret", &line.channel_secret),
			("line.channel_access_token", &line.channel_access_token),
			("line.api_base", &line.api_base),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}

		if !(5..=60).contains(&line.loading_seconds) || line.loading_seconds % 5 != 0 {
			return Err(Error::Validation {
				message: "line.loading_seconds must be a multiple of 5 between 5 and 60."
					.to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_base in [&mut cfg.providers.embedding.api_base, &mut cfg.providers.llm.api_base] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	if let Some(line) = cfg.line.as_mut() {
		line.api_base = line.api_base.trim().trim_end_matches('/').to_string();
	}
}
