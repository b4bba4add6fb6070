use ragdesk_domain::{intent::IntentResult, sql_extract, sql_gate};
use ragdesk_storage::Row;

use crate::{RagService, Result, prompts};

impl RagService {
	/// Asks the model for a single SELECT. An empty string means no usable statement came back;
	/// only retrieval failures are errors.
	pub async fn generate_sql(&self, query: &str, intent: &IntentResult) -> Result<String> {
		let schemas =
			self.knowledge.search_relevant_schemas(query, self.cfg.query.schema_k).await?;
		let examples =
			self.knowledge.search_similar_examples(query, self.cfg.query.sql_examples_k).await?;
		let prompt = prompts::sql_prompt(query, intent, &schemas, &examples);
		let reply = match self.providers.llm.chat(&self.cfg.providers.llm, &prompt).await {
			Ok(reply) => reply,
			Err(err) => {
				tracing::error!(error = %err, "SQL generation failed.");

				return Ok(String::new());
			},
		};

		match sql_extract::extract_sql_with_strategy(&reply) {
			Some((strategy, sql)) => {
				tracing::info!(strategy, sql = %sql, "SQL generated.");

				Ok(sql)
			},
			None => {
				tracing::warn!(reply = %reply, "No SQL statement found in model reply.");

				Ok(String::new())
			},
		}
	}

	/// Runs `sql` only if it passes the safety gate. Rejections and execution failures are logged
	/// and collapse to `None`.
	pub async fn execute_guarded(&self, sql: &str) -> Option<Vec<Row>> {
		if let Err(rejection) = sql_gate::inspect(sql) {
			tracing::warn!(
				reason = rejection.as_str(),
				detail = %rejection,
				sql = %sql,
				"Refusing to execute SQL."
			);

			return None;
		}

		match self.executor.execute(sql).await {
			Ok(rows) => {
				tracing::info!(row_count = rows.len(), "SQL executed.");

				Some(rows)
			},
			Err(err) => {
				tracing::error!(error = %err, sql = %sql, "SQL execution failed.");

				None
			},
		}
	}
}
