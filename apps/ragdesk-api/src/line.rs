//! LINE webhook: verifies the channel signature, acknowledges immediately, and answers each text
//! message in the background.

use std::sync::Arc;

use axum::{
	body::Bytes,
	extract::State,
	http::{HeaderMap, StatusCode},
};

use ragdesk_providers::line::{self, WebhookEvent, WebhookPayload};
use ragdesk_service::RagService;

use crate::{
	routes::{ApiError, json_error},
	state::{AppState, LineBot},
};

pub const SIGNATURE_HEADER: &str = "x-line-signature";

pub async fn webhook(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<StatusCode, ApiError> {
	let Some(bot) = state.line.clone() else {
		return Err(json_error(
			StatusCode::NOT_FOUND,
			"LINE_NOT_CONFIGURED",
			"LINE channel is not configured.",
			None,
		));
	};
	let signature =
		headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok()).unwrap_or_default();

	if !line::verify_signature(&bot.channel_secret, &body, signature) {
		tracing::warn!("Rejected LINE webhook with an invalid signature.");

		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_SIGNATURE",
			"X-Line-Signature does not match the request body.",
			None,
		));
	}

	let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|err| {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.to_string(), None)
	})?;

	for event in payload.events {
		if event.text().is_none() {
			tracing::debug!(kind = %event.kind, "Ignoring non-text LINE event.");

			continue;
		}

		tokio::spawn(handle_text_event(state.service.clone(), bot.clone(), event));
	}

	Ok(StatusCode::OK)
}

async fn handle_text_event(service: Arc<RagService>, bot: Arc<LineBot>, event: WebhookEvent) {
	let Some(text) = event.text() else {
		return;
	};

	// The loading indicator only exists in one-on-one chats.
	let user_id = event
		.source
		.as_ref()
		.filter(|source| source.kind == "user")
		.and_then(|source| source.user_id.as_deref());

	if let Some(user_id) = user_id
		&& let Err(err) = bot.client.start_loading(user_id).await
	{
		tracing::debug!(error = %err, "Loading indicator failed.");
	}

	let result = service.process_query(text).await;

	tracing::info!(
		intent = %result.intent,
		success = result.success,
		result_count = ?result.result_count,
		"Answered LINE message."
	);

	let replied = match event.reply_token.as_deref() {
		Some(token) => match bot.client.reply(token, &result.response).await {
			Ok(()) => true,
			Err(err) => {
				tracing::warn!(error = %err, "LINE reply failed. Falling back to push.");

				false
			},
		},
		None => false,
	};

	if replied {
		return;
	}

	let Some(target) = event.source.as_ref().and_then(|source| source.push_target()) else {
		tracing::warn!("LINE event has no push target. Answer dropped.");

		return;
	};

	if let Err(err) = bot.client.push(target, &result.response).await {
		tracing::error!(error = %err, "LINE push failed.");
	}
}
