use ragdesk_storage::Row;

use crate::{RagService, prompts};

pub const NO_ROWS_MESSAGE: &str = "抱歉，沒有找到符合的資料。";

/// Answer used when the model cannot phrase the result itself.
pub fn fallback_response(row_count: usize) -> String {
	if row_count == 0 {
		return NO_ROWS_MESSAGE.to_string();
	}

	format!("查詢完成，共找到 {row_count} 筆資料。")
}

impl RagService {
	pub async fn generate_response(&self, query: &str, rows: &[Row]) -> String {
		let prompt =
			prompts::response_prompt(query, rows, self.cfg.query.response_max_rows as usize);

		match self.providers.llm.chat(&self.cfg.providers.llm, &prompt).await {
			Ok(reply) => reply.trim().to_string(),
			Err(err) => {
				tracing::error!(error = %err, "Response generation failed. Using fallback text.");

				fallback_response(rows.len())
			},
		}
	}
}
