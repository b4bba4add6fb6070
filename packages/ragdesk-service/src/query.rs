use serde::{Deserialize, Serialize};

use ragdesk_domain::intent::IntentResult;

use crate::{RagService, Result};

pub const SCOPE_NOTICE: &str = "目前我只能協助您：\n1. FAQ 常見問題查詢\n2. 知識庫文章搜尋\n3. 客服工單查詢\n\n請問您需要哪種協助？";
pub const SYNTHESIS_FAILED_MESSAGE: &str = "抱歉，無法理解您的查詢需求。";
pub const EXECUTION_FAILED_MESSAGE: &str = "抱歉，查詢執行時發生錯誤。";
pub const PROCESSING_FAILED_MESSAGE: &str = "抱歉，查詢處理時發生錯誤，請稍後再試。";
pub const ERROR_INTENT: &str = "error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
	pub success: bool,
	pub response: String,
	pub intent: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sql_query: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result_count: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confidence: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sql_executed: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl QueryResult {
	fn reply(success: bool, response: impl Into<String>, intent: &IntentResult) -> Self {
		Self {
			success,
			response: response.into(),
			intent: intent.intent.to_string(),
			sql_query: None,
			result_count: None,
			confidence: None,
			sql_executed: None,
			error: None,
		}
	}

	fn failure(error: String) -> Self {
		Self {
			success: false,
			response: PROCESSING_FAILED_MESSAGE.to_string(),
			intent: ERROR_INTENT.to_string(),
			sql_query: None,
			result_count: None,
			confidence: None,
			sql_executed: None,
			error: Some(error),
		}
	}
}

impl RagService {
	/// Answers one user message. Every failure is turned into an apology, so callers always get a
	/// result to show.
	pub async fn process_query(&self, text: &str) -> QueryResult {
		tracing::info!(query = %text, "Processing query.");

		match self.answer(text).await {
			Ok(result) => result,
			Err(err) => {
				tracing::error!(error = %err, "Query processing failed.");

				QueryResult::failure(err.to_string())
			},
		}
	}

	async fn answer(&self, text: &str) -> Result<QueryResult> {
		let intent = self.classify_intent(text).await;

		if !intent.intent.is_supported() {
			return Ok(QueryResult {
				confidence: Some(intent.confidence),
				..QueryResult::reply(true, SCOPE_NOTICE, &intent)
			});
		}

		if let Some(answer) = self.check_static_response(text, &intent).await? {
			return Ok(QueryResult {
				sql_executed: Some(false),
				..QueryResult::reply(true, answer, &intent)
			});
		}

		let sql = self.generate_sql(text, &intent).await?;

		if sql.is_empty() {
			return Ok(QueryResult::reply(false, SYNTHESIS_FAILED_MESSAGE, &intent));
		}

		let Some(rows) = self.execute_guarded(&sql).await else {
			return Ok(QueryResult::reply(false, EXECUTION_FAILED_MESSAGE, &intent));
		};
		let response = self.generate_response(text, &rows).await;

		Ok(QueryResult {
			sql_query: Some(sql),
			result_count: Some(rows.len()),
			confidence: Some(intent.confidence),
			sql_executed: Some(true),
			..QueryResult::reply(true, response, &intent)
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn absent_fields_are_omitted_from_json() {
		let result = QueryResult::failure("Qdrant error: unavailable".to_string());
		let json = serde_json::to_value(&result).expect("Serialize failed.");

		assert_eq!(
			json,
			serde_json::json!({
				"success": false,
				"response": PROCESSING_FAILED_MESSAGE,
				"intent": "error",
				"error": "Qdrant error: unavailable"
			})
		);
	}
}
