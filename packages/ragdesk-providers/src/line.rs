//! LINE Messaging API: webhook signature checks, event payloads, and the outbound calls the bot
//! makes (loading indicator, reply, push).

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap},
};
use serde::Deserialize;
use sha2::Sha256;

use crate::{Error, Result};

/// LINE rejects text messages longer than this many characters.
pub const MAX_TEXT_CHARS: usize = 5_000;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
	#[serde(default)]
	pub destination: String,
	#[serde(default)]
	pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub reply_token: Option<String>,
	#[serde(default)]
	pub source: Option<EventSource>,
	#[serde(default)]
	pub message: Option<EventMessage>,
}
impl WebhookEvent {
	/// The text of a text-message event; `None` for every other event kind.
	pub fn text(&self) -> Option<&str> {
		if self.kind != "message" {
			return None;
		}

		let message = self.message.as_ref()?;

		if message.kind != "text" {
			return None;
		}

		message.text.as_deref()
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub user_id: Option<String>,
	#[serde(default)]
	pub group_id: Option<String>,
	#[serde(default)]
	pub room_id: Option<String>,
}
impl EventSource {
	pub fn push_target(&self) -> Option<&str> {
		self.group_id.as_deref().or(self.room_id.as_deref()).or(self.user_id.as_deref())
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub text: Option<String>,
}

/// Computes the base64 HMAC-SHA256 of `body` keyed by the channel secret, as LINE sends it in
/// `X-Line-Signature`.
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String> {
	let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).map_err(|_| {
		Error::InvalidConfig { message: "LINE channel secret is not a usable HMAC key.".to_string() }
	})?;

	mac.update(body);

	Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
	let Ok(expected) = STANDARD.decode(signature.trim()) else {
		return false;
	};
	let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
		return false;
	};

	mac.update(body);

	mac.verify_slice(&expected).is_ok()
}

pub struct LineClient {
	client: Client,
	api_base: String,
	access_token: String,
	loading_seconds: u32,
}
impl LineClient {
	pub fn new(cfg: &ragdesk_config::Line) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self {
			client,
			api_base: cfg.api_base.trim_end_matches('/').to_string(),
			access_token: cfg.channel_access_token.clone(),
			loading_seconds: cfg.loading_seconds,
		})
	}

	/// Shows the typing indicator in a one-on-one chat. LINE only accepts user ids here.
	pub async fn start_loading(&self, chat_id: &str) -> Result<()> {
		let body = serde_json::json!({
			"chatId": chat_id,
			"loadingSeconds": self.loading_seconds,
		});

		self.post("/v2/bot/chat/loading/start", &body).await
	}

	pub async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
		let body = serde_json::json!({
			"replyToken": reply_token,
			"messages": [text_message(text)],
		});

		self.post("/v2/bot/message/reply", &body).await
	}

	pub async fn push(&self, to: &str, text: &str) -> Result<()> {
		let body = serde_json::json!({
			"to": to,
			"messages": [text_message(text)],
		});

		self.post("/v2/bot/message/push", &body).await
	}

	async fn post(&self, path: &str, body: &serde_json::Value) -> Result<()> {
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, format!("Bearer {}", self.access_token).parse()?);

		self.client
			.post(format!("{}{}", self.api_base, path))
			.headers(headers)
			.json(body)
			.send()
			.await?
			.error_for_status()?;

		Ok(())
	}
}

fn text_message(text: &str) -> serde_json::Value {
	serde_json::json!({ "type": "text", "text": truncate_text(text) })
}

fn truncate_text(text: &str) -> String {
	if text.chars().count() <= MAX_TEXT_CHARS {
		return text.to_string();
	}

	text.chars().take(MAX_TEXT_CHARS).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn signature_round_trips_and_rejects_tampering() {
		let body = br#"{"destination":"U1","events":[]}"#;
		let signature = sign("channel-secret", body).expect("Signing failed.");

		assert!(verify_signature("channel-secret", body, &signature));
		assert!(!verify_signature("other-secret", body, &signature));
		assert!(!verify_signature("channel-secret", b"{}", &signature));
		assert!(!verify_signature("channel-secret", body, "not base64!"));
	}

	#[test]
	fn extracts_text_from_message_events_only() {
		let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
			"destination": "Ubot",
			"events": [
				{
					"type": "message",
					"replyToken": "r1",
					"source": { "type": "user", "userId": "U123" },
					"message": { "type": "text", "id": "m1", "text": "顯示常見問題" }
				},
				{
					"type": "message",
					"replyToken": "r2",
					"source": { "type": "user", "userId": "U123" },
					"message": { "type": "sticker", "id": "m2" }
				},
				{ "type": "follow", "replyToken": "r3", "source": { "type": "user", "userId": "U9" } }
			]
		}))
		.expect("Payload should parse.");

		assert_eq!(payload.events.len(), 3);
		assert_eq!(payload.events[0].text(), Some("顯示常見問題"));
		assert_eq!(payload.events[1].text(), None);
		assert_eq!(payload.events[2].text(), None);
	}

	#[test]
	fn group_sources_push_to_the_group() {
		let source = EventSource {
			kind: "group".to_string(),
			user_id: Some("U1".to_string()),
			group_id: Some("C1".to_string()),
			room_id: None,
		};

		assert_eq!(source.push_target(), Some("C1"));
	}

	#[test]
	fn long_text_is_truncated_on_char_boundaries() {
		let text = "工".repeat(MAX_TEXT_CHARS + 10);

		assert_eq!(truncate_text(&text).chars().count(), MAX_TEXT_CHARS);
		assert_eq!(truncate_text("短"), "短");
	}
}
