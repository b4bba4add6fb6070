use ragdesk_domain::intent::{self, IntentResult};

use crate::{RagService, prompts};

impl RagService {
	/// Classifies the query. Falls back to keyword rules when the model is unavailable or its
	/// reply cannot be used, so this never fails.
	pub async fn classify_intent(&self, query: &str) -> IntentResult {
		let examples = match self
			.knowledge
			.search_similar_examples(query, self.cfg.query.intent_examples_k)
			.await
		{
			Ok(examples) => examples,
			Err(err) => {
				tracing::warn!(error = %err, "Example retrieval failed. Classifying without context.");

				Vec::new()
			},
		};
		let prompt = prompts::intent_prompt(query, &examples);
		let reply = match self.providers.llm.chat(&self.cfg.providers.llm, &prompt).await {
			Ok(reply) => reply,
			Err(err) => {
				tracing::error!(error = %err, "Intent classification failed. Using keyword fallback.");

				return intent::fallback_intent(query);
			},
		};

		match intent::parse_intent_reply(&reply) {
			Ok(result) => {
				tracing::info!(
					intent = %result.intent,
					confidence = result.confidence,
					"Intent classified."
				);

				result
			},
			Err(failure) => {
				tracing::warn!(reason = %failure, "Intent reply unusable. Using keyword fallback.");

				intent::fallback_intent(query)
			},
		}
	}
}
