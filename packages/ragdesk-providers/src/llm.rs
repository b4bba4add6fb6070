use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Sends a single user turn and returns the raw reply text.
pub async fn chat(cfg: &ragdesk_config::LlmProviderConfig, prompt: &str) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"messages": [{ "role": "user", "content": prompt }],
		"stream": false,
		"temperature": cfg.temperature,
		"options": { "temperature": cfg.temperature },
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_chat_response(json)
}

/// Ollama `/api/chat` replies carry `message.content`; OpenAI-compatible endpoints carry
/// `choices[0].message.content`.
fn parse_chat_response(json: Value) -> Result<String> {
	let content = json
		.get("message")
		.and_then(|message| message.get("content"))
		.or_else(|| {
			json.get("choices")
				.and_then(|choices| choices.get(0))
				.and_then(|choice| choice.get("message"))
				.and_then(|message| message.get("content"))
		})
		.or_else(|| json.get("response"))
		.and_then(|content| content.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat response is missing message content.".to_string(),
		})?;

	Ok(content.trim().to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_ollama_chat_reply() {
		let json = serde_json::json!({
			"model": "llama3.1:8b",
			"message": { "role": "assistant", "content": "  SELECT 1;\n" },
			"done": true
		});

		assert_eq!(parse_chat_response(json).expect("parse failed"), "SELECT 1;");
	}

	#[test]
	fn parses_openai_chat_reply() {
		let json = serde_json::json!({
			"choices": [{ "index": 0, "message": { "role": "assistant", "content": "{\"intent\":\"faq_query\"}" } }]
		});

		assert_eq!(parse_chat_response(json).expect("parse failed"), "{\"intent\":\"faq_query\"}");
	}

	#[test]
	fn rejects_reply_without_content() {
		let json = serde_json::json!({ "choices": [] });

		assert!(parse_chat_response(json).is_err());
	}
}
