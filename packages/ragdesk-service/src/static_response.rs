use ragdesk_domain::{intent::IntentResult, similarity};

use crate::{RagService, Result};

impl RagService {
	/// Returns the pre-authored answer of the first static example whose wording overlaps the
	/// query closely enough. The classified intent does not narrow the match.
	pub async fn check_static_response(
		&self,
		query: &str,
		intent: &IntentResult,
	) -> Result<Option<String>> {
		let examples =
			self.knowledge.search_similar_examples(query, self.cfg.query.static_examples_k).await?;
		let threshold = self.cfg.query.static_similarity_threshold;

		for example in examples {
			if !example.record.is_static() {
				continue;
			}
			if similarity::is_similar(query, &example.record.natural_query, threshold) {
				tracing::info!(
					natural_query = %example.record.natural_query,
					intent = %intent.intent,
					"Static response matched."
				);

				return Ok(Some(example.record.description));
			}
		}

		Ok(None)
	}
}
