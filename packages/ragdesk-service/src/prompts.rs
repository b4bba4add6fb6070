//! Prompt rendering for the three model calls: intent classification, SQL synthesis, and the
//! natural-language answer over result rows.

use std::fmt::Write as _;

use ragdesk_domain::{
	intent::{Intent, IntentResult},
	records::{ExampleMatch, SchemaMatch},
};
use ragdesk_storage::Row;

const SQL_RULES: &str = "\
**重要規則：**
1. 只生成單表 SELECT 查詢，避免複雜的 JOIN
2. **嚴格使用提供的表名和欄位名，不要猜測**
3. 表別名要簡單：如 faq, kb, ticket
4. WHERE 條件要具體，不使用參數佔位符 ?
5. 優先查詢 is_active = true 的記錄
6. LIMIT 結果數量（通常 5-10 筆）

**關鍵欄位對應：**
- customer_service_faq 表：使用 question, answer (不是 title)
- customer_service_knowledgebase 表：使用 title, content, summary
- customer_service_serviceticket 表：使用 ticket_number, title, description

**範例格式：**
```sql
SELECT question, answer
FROM customer_service_faq
WHERE question LIKE '%密碼%' AND is_active = true
LIMIT 5;
```
只回覆一個完整的 SQL 語句，不要其他解釋：";

pub fn intent_prompt(query: &str, examples: &[ExampleMatch]) -> String {
	let mut prompt = String::from("你是 CRM 系統助手。分析用戶查詢的意圖。\n意圖類別:\n");

	for (intent, label) in Intent::CATEGORIES {
		let _ = writeln!(prompt, "- {intent}: {label}");
	}

	prompt.push('\n');

	if !examples.is_empty() {
		prompt.push_str("參考範例:\n");

		for (idx, example) in examples.iter().enumerate() {
			let _ = writeln!(
				prompt,
				"{}. {}: {}",
				idx + 1,
				example.record.intent,
				example.record.natural_query
			);
		}

		prompt.push('\n');
	}

	let _ = write!(
		prompt,
		"用戶查詢: \"{query}\"\n\n請回覆 JSON 格式:\n{{\n    \"intent\": \"意圖類別\",\n    \"confidence\": 0.9,\n    \"entities\": [\"提取的關鍵字\"],\n    \"reasoning\": \"分析原因\"\n}}"
	);

	prompt
}

pub fn sql_prompt(
	query: &str,
	intent: &IntentResult,
	schemas: &[SchemaMatch],
	examples: &[ExampleMatch],
) -> String {
	let entities = serde_json::to_string(&intent.entities).unwrap_or_else(|_| "[]".to_string());
	let mut prompt = format!(
		"你是 SQL 專家。根據用戶查詢生成簡單的 SELECT 語句。\n用戶查詢: \"{query}\"\n意圖: {}\n關鍵字: {entities}\n\n",
		intent.intent
	);

	if !schemas.is_empty() {
		prompt.push_str("相關資料表:\n");

		for schema in schemas {
			let _ = writeln!(prompt, "{}", schema.record.to_text());
		}
	}

	if !examples.is_empty() {
		prompt.push_str("參考 SQL 範例:\n");

		for example in examples {
			let _ = writeln!(prompt, "查詢: {}", example.record.natural_query);
			let _ = writeln!(prompt, "SQL: {}\n", example.record.sql_query);
		}
	}

	prompt.push_str(SQL_RULES);

	prompt
}

/// Only the first `max_rows` rows are shown; the total count is always stated.
pub fn response_prompt(query: &str, rows: &[Row], max_rows: usize) -> String {
	let shown = &rows[..rows.len().min(max_rows)];
	let data = serde_json::to_string_pretty(shown).unwrap_or_else(|_| "[]".to_string());

	format!(
		"你是友善的 CRM 助手。將查詢結果轉為中文回應。\n\n用戶查詢: \"{query}\"\n結果筆數: {}\n結果資料: {data}\n\n要求:\n1. 用友善專業的語調\n2. 簡潔總結結果\n3. 突出重要資訊\n4. 如果超過{max_rows}筆，提及總數\n\n回應:",
		rows.len()
	)
}

#[cfg(test)]
mod tests {
	use ragdesk_domain::records::{ExampleRecord, SchemaField, SchemaRecord};

	use super::*;

	fn example(intent: &str, natural_query: &str, sql: &str) -> ExampleMatch {
		ExampleMatch { record: ExampleRecord::new(intent, natural_query, sql, ""), score: 0.9 }
	}

	#[test]
	fn intent_prompt_lists_categories_and_examples() {
		let prompt = intent_prompt("顯示常見問題", &[example("faq_query", "顯示所有常見問題", "")]);

		assert!(prompt.contains("- ticket_management_query: 客服工單管理查詢"));
		assert!(prompt.contains("參考範例:\n1. faq_query: 顯示所有常見問題\n"));
		assert!(prompt.contains("用戶查詢: \"顯示常見問題\""));
		assert!(!prompt.contains("general_info"));
	}

	#[test]
	fn intent_prompt_without_examples_omits_context() {
		assert!(!intent_prompt("hi", &[]).contains("參考範例"));
	}

	#[test]
	fn sql_prompt_includes_schema_text_and_examples() {
		let schema = SchemaMatch {
			record: SchemaRecord {
				table_name: "customer_service_faq".to_string(),
				description: "常見問題表".to_string(),
				fields: vec![SchemaField::new("question", "varchar", "問題內容")],
				relationships: Vec::new(),
			},
			score: 0.8,
		};
		let intent = IntentResult {
			intent: Intent::FaqQuery,
			confidence: 0.9,
			entities: vec!["密碼".to_string()],
			reasoning: String::new(),
		};
		let prompt = sql_prompt(
			"密碼問題",
			&intent,
			&[schema],
			&[example("faq_query", "顯示所有常見問題", "SELECT question FROM customer_service_faq")],
		);

		assert!(prompt.contains("意圖: faq_query\n關鍵字: [\"密碼\"]"));
		assert!(prompt.contains("資料表: customer_service_faq\n描述: 常見問題表"));
		assert!(prompt.contains("SQL: SELECT question FROM customer_service_faq\n"));
		assert!(prompt.ends_with("只回覆一個完整的 SQL 語句，不要其他解釋："));
	}

	#[test]
	fn response_prompt_limits_rows_but_reports_total() {
		let rows = (0..7)
			.map(|idx| {
				let mut row = Row::new();

				row.insert("ticket_number".to_string(), serde_json::json!(format!("T-{idx}")));

				row
			})
			.collect::<Vec<_>>();
		let prompt = response_prompt("工單", &rows, 5);

		assert!(prompt.contains("結果筆數: 7"));
		assert!(prompt.contains("T-4"));
		assert!(!prompt.contains("T-5"));
	}
}
