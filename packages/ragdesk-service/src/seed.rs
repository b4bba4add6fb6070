use serde::{Deserialize, Serialize};

use ragdesk_domain::records::{ExampleRecord, SchemaField, SchemaRecord};

use crate::{Error, RagService, Result};

const KB_CATEGORY_RELATION: &str =
	"與 customer_service_knowledgebasecategory 表通過 category_id 關聯 (多對一)";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SeedData {
	#[serde(default)]
	pub schemas: Vec<SchemaRecord>,
	#[serde(default)]
	pub examples: Vec<ExampleRecord>,
}
impl SeedData {
	/// Table descriptions and query examples for the customer-service tables.
	pub fn builtin() -> Self {
		Self { schemas: builtin_schemas(), examples: builtin_examples() }
	}

	fn validate(&self) -> Result<()> {
		if let Some(schema) = self.schemas.iter().find(|s| s.table_name.trim().is_empty()) {
			return Err(Error::InvalidRequest {
				message: format!("Schema with description {:?} has no table_name.", schema.description),
			});
		}
		if self.examples.iter().any(|e| e.natural_query.trim().is_empty()) {
			return Err(Error::InvalidRequest {
				message: "Every example needs a natural_query.".to_string(),
			});
		}
		if self.examples.iter().any(|e| e.sql_query.trim().is_empty() && e.description.is_empty())
		{
			return Err(Error::InvalidRequest {
				message: "Examples without SQL must carry a description to answer with."
					.to_string(),
			});
		}

		Ok(())
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
	pub schema_count: u64,
	pub example_count: u64,
}

impl RagService {
	/// Creates the collections if needed and stores every record. Records keep stable ids, so
	/// seeding twice overwrites instead of duplicating.
	pub async fn seed(&self, data: &SeedData) -> Result<SeedReport> {
		data.validate()?;

		self.knowledge.ensure_collections().await?;

		let mut report = SeedReport { schema_count: 0, example_count: 0 };

		for schema in &data.schemas {
			self.knowledge.add_schema(schema).await?;

			report.schema_count += 1;
		}
		for example in &data.examples {
			self.knowledge.add_example(example).await?;

			report.example_count += 1;
		}

		tracing::info!(
			schema_count = report.schema_count,
			example_count = report.example_count,
			"Knowledge base seeded."
		);

		Ok(report)
	}
}

fn schema(
	table_name: &str,
	description: &str,
	fields: &[(&str, &str, &str)],
	relationships: &[&str],
) -> SchemaRecord {
	SchemaRecord {
		table_name: table_name.to_string(),
		description: description.to_string(),
		fields: fields
			.iter()
			.map(|(name, field_type, description)| SchemaField::new(name, field_type, description))
			.collect(),
		relationships: relationships.iter().map(|rel| rel.to_string()).collect(),
	}
}

fn builtin_schemas() -> Vec<SchemaRecord> {
	vec![
		schema(
			"customers_customer",
			"客戶資料表",
			&[
				("id", "int", "客戶 ID，主鍵"),
				("first_name", "varchar", "名字"),
				("last_name", "varchar", "姓氏"),
				("email", "varchar", "電子郵件，唯一"),
				("phone", "varchar", "電話號碼"),
				("company", "varchar", "公司名稱"),
				("address", "text", "地址"),
				("city", "varchar", "城市"),
				("created_at", "datetime", "建立時間"),
				("updated_at", "datetime", "更新時間"),
			],
			&["與 customer_service_serviceticket 表通過 customer_id 關聯 (一對多)"],
		),
		schema(
			"customer_service_faq",
			"常見問題表",
			&[
				("id", "int", "FAQ ID，主鍵"),
				("question", "varchar", "問題內容，最大300字"),
				("answer", "text", "答案內容"),
				(
					"category_id",
					"int",
					"分類 ID，外鍵關聯 customer_service_knowledgebasecategory",
				),
				("is_active", "boolean", "是否啟用"),
				("is_featured", "boolean", "是否置頂"),
				("sort_order", "int", "排序順序"),
				("view_count", "int", "查看次數"),
				("created_by_id", "int", "建立人員 ID"),
				("created_at", "datetime", "建立時間"),
				("updated_at", "datetime", "更新時間"),
			],
			&[KB_CATEGORY_RELATION],
		),
		schema(
			"customer_service_knowledgebase",
			"知識庫文章表",
			&[
				("id", "int", "文章 ID，主鍵"),
				("title", "varchar", "文章標題，最大200字"),
				("content", "text", "文章內容"),
				("summary", "varchar", "文章摘要，最大500字"),
				("category_id", "int", "分類 ID，外鍵"),
				("content_type", "varchar", "內容類型：faq, guide, policy, troubleshooting, sop"),
				("tags", "json", "標籤列表"),
				("is_public", "boolean", "是否公開可見"),
				("is_featured", "boolean", "是否精選文章"),
				("is_active", "boolean", "是否啟用"),
				("view_count", "int", "查看次數"),
				("helpful_count", "int", "有用次數"),
				("not_helpful_count", "int", "無用次數"),
				("created_by_id", "int", "建立人員 ID"),
				("updated_by_id", "int", "更新人員 ID"),
				("created_at", "datetime", "建立時間"),
				("updated_at", "datetime", "更新時間"),
			],
			&[KB_CATEGORY_RELATION],
		),
		schema(
			"customer_service_serviceticket",
			"客服工單表",
			&[
				("id", "int", "工單 ID，主鍵"),
				("ticket_number", "varchar", "工單號碼，唯一，格式：CS+年月日+4位序號"),
				("customer_id", "int", "客戶 ID，外鍵關聯 customers_customer"),
				("title", "varchar", "工單標題，最大200字"),
				("description", "text", "問題描述"),
				(
					"category",
					"varchar",
					"問題分類：general, technical, billing, product, shipping, return, complaint, feature_request",
				),
				("priority", "varchar", "優先級：low, medium, high, urgent"),
				("status", "varchar", "工單狀態：open, in_progress, pending, resolved, closed"),
				("assigned_to_id", "int", "負責人員 ID"),
				("created_by_id", "int", "建立人員 ID"),
				("tags", "json", "標籤列表"),
				("satisfaction_rating", "int", "滿意度評分 1-5分"),
				("satisfaction_comment", "text", "滿意度評語"),
				("created_at", "datetime", "建立時間"),
				("updated_at", "datetime", "更新時間"),
				("first_response_at", "datetime", "首次回應時間"),
				("resolved_at", "datetime", "解決時間"),
				("closed_at", "datetime", "關閉時間"),
			],
			&[
				"與 customers_customer 表通過 customer_id 關聯 (多對一)",
				"與 customer_service_servicenote 表通過 ticket_id 關聯 (一對多)",
			],
		),
	]
}

fn builtin_examples() -> Vec<ExampleRecord> {
	vec![
		ExampleRecord::new(
			"faq_query",
			"如何修改密碼",
			"",
			"請到個人設定頁面，點選「修改密碼」，輸入舊密碼和新密碼即可完成修改。",
		),
		ExampleRecord::new(
			"faq_query",
			"搜尋密碼相關的常見問題",
			"SELECT question, answer FROM customer_service_faq WHERE question LIKE '%密碼%' AND is_active = true",
			"從資料庫搜尋包含密碼關鍵字的常見問題",
		),
		ExampleRecord::new(
			"faq_query",
			"顯示所有常見問題",
			"SELECT question, answer FROM customer_service_faq WHERE is_active = true ORDER BY is_featured DESC, sort_order ASC LIMIT 10",
			"顯示前10個常見問題",
		),
		ExampleRecord::new(
			"faq_query",
			"列出常見問題清單",
			"SELECT question, answer FROM customer_service_faq WHERE is_active = true ORDER BY view_count DESC LIMIT 5",
			"顯示最多人查看的常見問題",
		),
		ExampleRecord::new(
			"knowledge_base_query",
			"系統操作指南",
			"",
			"CRM 系統操作指南：1. 登入後可在儀表板查看總覽 2. 左側選單可管理客戶、訂單等 3. 詳細操作請參考各功能頁面的說明",
		),
		ExampleRecord::new(
			"knowledge_base_query",
			"搜尋操作相關文章",
			"SELECT title, summary FROM customer_service_knowledgebase WHERE (title LIKE '%操作%' OR content LIKE '%操作%') AND is_active = true LIMIT 5",
			"搜尋標題或內容包含操作關鍵字的知識庫文章",
		),
		ExampleRecord::new(
			"knowledge_base_query",
			"精選知識庫文章",
			"SELECT title, summary FROM customer_service_knowledgebase WHERE is_featured = true AND is_active = true ORDER BY updated_at DESC",
			"顯示所有精選的知識庫文章",
		),
		ExampleRecord::new(
			"ticket_management_query",
			"如何建立客服工單",
			"",
			"建立客服工單：1. 點選「新增工單」2. 填寫問題描述 3. 選擇問題分類 4. 提交後會自動分配工單號碼",
		),
		ExampleRecord::new(
			"ticket_management_query",
			"顯示開啟中的工單",
			"SELECT ticket_number, title, status, priority, created_at FROM customer_service_serviceticket WHERE status = 'open' ORDER BY priority DESC, created_at ASC LIMIT 10",
			"顯示前10個開啟中的工單",
		),
		ExampleRecord::new(
			"ticket_management_query",
			"本週新建立的工單數量",
			"SELECT COUNT(*) AS ticket_count FROM customer_service_serviceticket WHERE created_at >= NOW() - INTERVAL '7 days'",
			"統計最近7天建立的工單數量",
		),
	]
}

#[cfg(test)]
mod tests {
	use ragdesk_domain::sql_gate;

	use super::*;

	#[test]
	fn builtin_seed_has_four_schemas_and_ten_examples() {
		let data = SeedData::builtin();

		assert_eq!(data.schemas.len(), 4);
		assert_eq!(data.examples.len(), 10);
		assert_eq!(data.examples.iter().filter(|e| e.is_static()).count(), 3);
		assert!(data.validate().is_ok());
	}

	#[test]
	fn builtin_sql_examples_pass_the_gate() {
		for example in SeedData::builtin().examples.iter().filter(|e| !e.is_static()) {
			assert_eq!(sql_gate::inspect(&example.sql_query), Ok(()), "{}", example.natural_query);
		}
	}

	#[test]
	fn examples_without_sql_or_answer_are_rejected() {
		let data = SeedData {
			schemas: Vec::new(),
			examples: vec![ExampleRecord::new("faq_query", "空白範例", "", "")],
		};

		assert!(matches!(data.validate(), Err(Error::InvalidRequest { .. })));
	}
}
