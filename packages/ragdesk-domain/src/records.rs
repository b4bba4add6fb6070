use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Description of one relational table, stored once and retrieved by similarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
	pub table_name: String,
	#[serde(default)]
	pub description: String,
	/// Ordered field map; the order is kept when the record is rendered into a prompt.
	#[serde(default)]
	pub fields: Vec<SchemaField>,
	#[serde(default)]
	pub relationships: Vec<String>,
}
impl SchemaRecord {
	/// Renders the document that is embedded and later injected into the SQL prompt.
	pub fn to_text(&self) -> String {
		let mut text = String::new();

		let _ = writeln!(text, "資料表: {}", self.table_name);

		if !self.description.is_empty() {
			let _ = writeln!(text, "描述: {}", self.description);
		}

		text.push_str("欄位:\n");

		for field in &self.fields {
			let _ = writeln!(text, "- {} ({}): {}", field.name, field.field_type, field.description);
		}

		if !self.relationships.is_empty() {
			text.push_str("關聯:\n");

			for relationship in &self.relationships {
				let _ = writeln!(text, "- {relationship}");
			}
		}

		text
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
	pub name: String,
	#[serde(rename = "type")]
	pub field_type: String,
	#[serde(default)]
	pub description: String,
}
impl SchemaField {
	pub fn new(name: &str, field_type: &str, description: &str) -> Self {
		Self {
			name: name.to_string(),
			field_type: field_type.to_string(),
			description: description.to_string(),
		}
	}
}

/// A natural-language question paired with the SQL that answers it.
///
/// An empty `sql_query` marks a static example whose `description` is the answer itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleRecord {
	pub intent: String,
	pub natural_query: String,
	#[serde(default)]
	pub sql_query: String,
	#[serde(default)]
	pub description: String,
}
impl ExampleRecord {
	pub fn new(intent: &str, natural_query: &str, sql_query: &str, description: &str) -> Self {
		Self {
			intent: intent.to_string(),
			natural_query: natural_query.to_string(),
			sql_query: sql_query.to_string(),
			description: description.to_string(),
		}
	}

	pub fn is_static(&self) -> bool {
		self.sql_query.trim().is_empty() && !self.description.is_empty()
	}

	pub fn to_text(&self) -> String {
		format!(
			"意圖: {}\n自然語言查詢: {}\n描述: {}",
			self.intent, self.natural_query, self.description
		)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaMatch {
	pub record: SchemaRecord,
	/// Similarity to the query; higher is closer.
	pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleMatch {
	pub record: ExampleRecord,
	pub score: f32,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_text_lists_fields_in_order() {
		let record = SchemaRecord {
			table_name: "customer_service_faq".to_string(),
			description: "常見問題表".to_string(),
			fields: vec![
				SchemaField::new("question", "varchar", "問題內容"),
				SchemaField::new("answer", "text", "答案內容"),
			],
			relationships: vec!["與 customer_service_knowledgebasecategory 表關聯".to_string()],
		};
		let text = record.to_text();

		assert_eq!(
			text,
			"資料表: customer_service_faq\n描述: 常見問題表\n欄位:\n- question (varchar): 問題內容\n- answer (text): 答案內容\n關聯:\n- 與 customer_service_knowledgebasecategory 表關聯\n"
		);
	}

	#[test]
	fn schema_text_skips_empty_sections() {
		let record = SchemaRecord {
			table_name: "t".to_string(),
			description: String::new(),
			fields: Vec::new(),
			relationships: Vec::new(),
		};

		assert_eq!(record.to_text(), "資料表: t\n欄位:\n");
	}

	#[test]
	fn static_examples_need_an_answer_and_no_sql() {
		assert!(ExampleRecord::new("faq_query", "如何修改密碼", "", "請到個人設定頁面").is_static());
		assert!(!ExampleRecord::new("faq_query", "如何修改密碼", "  ", "").is_static());
		assert!(
			!ExampleRecord::new("faq_query", "顯示所有常見問題", "SELECT 1", "說明").is_static()
		);
	}
}
