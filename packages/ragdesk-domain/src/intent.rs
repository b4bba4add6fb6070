use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FALLBACK_CONFIDENCE: f32 = 0.6;

/// Keyword groups scanned in priority order when the model reply is unusable.
const FALLBACK_RULES: [(&[&str], Intent); 6] = [
	(&["客戶", "顧客", "customer"], Intent::CustomerQuery),
	(&["訂單", "order"], Intent::OrderQuery),
	(&["產品", "商品", "product"], Intent::ProductQuery),
	(&["faq", "常見問題", "問答"], Intent::FaqQuery),
	(&["知識庫", "知識", "文章", "knowledge"], Intent::KnowledgeBaseQuery),
	(&["工單", "客服", "服務", "ticket", "service"], Intent::TicketManagementQuery),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	CustomerQuery,
	OrderQuery,
	ProductQuery,
	TransactionQuery,
	ServiceQuery,
	AnalyticsQuery,
	FaqQuery,
	KnowledgeBaseQuery,
	TicketManagementQuery,
	GeneralInfo,
}
impl Intent {
	/// Categories offered to the model, with the label shown next to each one.
	pub const CATEGORIES: [(Intent, &'static str); 9] = [
		(Intent::CustomerQuery, "客戶資料查詢"),
		(Intent::OrderQuery, "訂單資料查詢"),
		(Intent::ProductQuery, "產品資料查詢"),
		(Intent::TransactionQuery, "交易資料查詢"),
		(Intent::ServiceQuery, "客服工單查詢"),
		(Intent::AnalyticsQuery, "統計分析查詢"),
		(Intent::FaqQuery, "FAQ 常見問題查詢"),
		(Intent::KnowledgeBaseQuery, "知識庫文章查詢"),
		(Intent::TicketManagementQuery, "客服工單管理查詢"),
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::CustomerQuery => "customer_query",
			Self::OrderQuery => "order_query",
			Self::ProductQuery => "product_query",
			Self::TransactionQuery => "transaction_query",
			Self::ServiceQuery => "service_query",
			Self::AnalyticsQuery => "analytics_query",
			Self::FaqQuery => "faq_query",
			Self::KnowledgeBaseQuery => "knowledge_base_query",
			Self::TicketManagementQuery => "ticket_management_query",
			Self::GeneralInfo => "general_info",
		}
	}

	/// Intents answered from the customer-service tables. Everything else gets the scope notice.
	pub fn is_supported(self) -> bool {
		matches!(self, Self::FaqQuery | Self::KnowledgeBaseQuery | Self::TicketManagementQuery)
	}
}
impl fmt::Display for Intent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Intent {
	type Err = ParseFailure;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_lowercase();
		let intent = match normalized.as_str() {
			"customer_query" => Self::CustomerQuery,
			"order_query" => Self::OrderQuery,
			"product_query" => Self::ProductQuery,
			"transaction_query" => Self::TransactionQuery,
			"service_query" => Self::ServiceQuery,
			"analytics_query" => Self::AnalyticsQuery,
			"faq_query" => Self::FaqQuery,
			"knowledge_base_query" => Self::KnowledgeBaseQuery,
			"ticket_management_query" => Self::TicketManagementQuery,
			"general_info" => Self::GeneralInfo,
			_ => return Err(ParseFailure::UnknownIntent(s.to_string())),
		};

		Ok(intent)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
	pub intent: Intent,
	/// Always within `0.0..=1.0`.
	pub confidence: f32,
	/// Keywords extracted by the model, deduplicated in reply order.
	pub entities: Vec<String>,
	pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
	NoJsonObject,
	InvalidJson(String),
	MissingIntent,
	UnknownIntent(String),
}
impl fmt::Display for ParseFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NoJsonObject => f.write_str("Reply contains no JSON object."),
			Self::InvalidJson(message) => write!(f, "Reply JSON is invalid: {message}"),
			Self::MissingIntent => f.write_str("Reply JSON has no intent field."),
			Self::UnknownIntent(label) => write!(f, "Reply names an unknown intent {label:?}."),
		}
	}
}
impl std::error::Error for ParseFailure {}

/// Parses the first balanced JSON object found in a free-form model reply.
pub fn parse_intent_reply(reply: &str) -> Result<IntentResult, ParseFailure> {
	let object = first_json_object(reply)?;
	let intent = object
		.get("intent")
		.and_then(Value::as_str)
		.ok_or(ParseFailure::MissingIntent)?
		.parse::<Intent>()?;
	let confidence = object.get("confidence").and_then(number_like).unwrap_or(0.0);
	let entities = object
		.get("entities")
		.and_then(Value::as_array)
		.map(|values| collect_entities(values))
		.unwrap_or_default();
	let reasoning =
		object.get("reasoning").and_then(Value::as_str).unwrap_or_default().to_string();

	Ok(IntentResult { intent, confidence: clamp_confidence(confidence), entities, reasoning })
}

/// Deterministic classifier used when the model is unreachable or its reply is unusable.
pub fn fallback_intent(query: &str) -> IntentResult {
	let lowered = query.to_lowercase();
	let intent = FALLBACK_RULES
		.iter()
		.find(|(keywords, _)| keywords.iter().any(|keyword| lowered.contains(keyword)))
		.map(|(_, intent)| *intent)
		.unwrap_or(Intent::GeneralInfo);

	IntentResult {
		intent,
		confidence: FALLBACK_CONFIDENCE,
		entities: Vec::new(),
		reasoning: "關鍵字匹配".to_string(),
	}
}

fn first_json_object(text: &str) -> Result<serde_json::Map<String, Value>, ParseFailure> {
	let mut last_err = None;

	for (start, _) in text.match_indices('{') {
		let Some(len) = balanced_len(&text[start..]) else {
			continue;
		};

		match serde_json::from_str::<Value>(&text[start..start + len]) {
			Ok(Value::Object(map)) => return Ok(map),
			Ok(_) => {},
			Err(err) => last_err = Some(err.to_string()),
		}
	}

	match last_err {
		Some(message) => Err(ParseFailure::InvalidJson(message)),
		None => Err(ParseFailure::NoJsonObject),
	}
}

/// Byte length of the brace-balanced span at the start of `text`, ignoring braces in strings.
fn balanced_len(text: &str) -> Option<usize> {
	let mut depth = 0_usize;
	let mut in_string = false;
	let mut escaped = false;

	for (idx, ch) in text.char_indices() {
		if in_string {
			match ch {
				_ if escaped => escaped = false,
				'\\' => escaped = true,
				'"' => in_string = false,
				_ => {},
			}

			continue;
		}

		match ch {
			'"' => in_string = true,
			'{' => depth += 1,
			'}' => {
				depth = depth.checked_sub(1)?;

				if depth == 0 {
					return Some(idx + ch.len_utf8());
				}
			},
			_ => {},
		}
	}

	None
}

fn number_like(value: &Value) -> Option<f64> {
	match value {
		Value::Number(number) => number.as_f64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

fn clamp_confidence(value: f64) -> f32 {
	if value.is_finite() { value.clamp(0.0, 1.0) as f32 } else { 0.0 }
}

fn collect_entities(values: &[Value]) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(values.len());

	for value in values {
		let entity = match value {
			Value::String(text) => text.trim().to_string(),
			Value::Number(number) => number.to_string(),
			_ => continue,
		};

		if !entity.is_empty() && !out.contains(&entity) {
			out.push(entity);
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_json_wrapped_in_prose() {
		let reply = "好的，分析如下：\n{\"intent\": \"faq_query\", \"confidence\": 0.92, \"entities\": [\"密碼\", \"密碼\"], \"reasoning\": \"詢問密碼\"}\n以上。";
		let parsed = parse_intent_reply(reply).expect("parse failed");

		assert_eq!(parsed.intent, Intent::FaqQuery);
		assert!((parsed.confidence - 0.92).abs() < f32::EPSILON);
		assert_eq!(parsed.entities, vec!["密碼".to_string()]);
		assert_eq!(parsed.reasoning, "詢問密碼");
	}

	#[test]
	fn braces_inside_strings_do_not_end_the_object() {
		let reply = r#"{"intent": "knowledge_base_query", "reasoning": "用 } 符號"} trailing }"#;
		let parsed = parse_intent_reply(reply).expect("parse failed");

		assert_eq!(parsed.intent, Intent::KnowledgeBaseQuery);
		assert_eq!(parsed.reasoning, "用 } 符號");
	}

	#[test]
	fn skips_a_non_json_brace_group() {
		let reply = "{思考中} {\"intent\": \"order_query\", \"confidence\": \"0.7\"}";
		let parsed = parse_intent_reply(reply).expect("parse failed");

		assert_eq!(parsed.intent, Intent::OrderQuery);
		assert!((parsed.confidence - 0.7).abs() < 1e-6);
	}

	#[test]
	fn confidence_is_clamped() {
		let parsed = parse_intent_reply(r#"{"intent": "faq_query", "confidence": 7}"#)
			.expect("parse failed");

		assert_eq!(parsed.confidence, 1.0);
	}

	#[test]
	fn reports_typed_failures() {
		assert_eq!(parse_intent_reply("沒有 JSON"), Err(ParseFailure::NoJsonObject));
		assert_eq!(parse_intent_reply("{\"intent\": "), Err(ParseFailure::NoJsonObject));
		assert_eq!(
			parse_intent_reply(r#"{"confidence": 0.5}"#),
			Err(ParseFailure::MissingIntent)
		);
		assert_eq!(
			parse_intent_reply(r#"{"intent": "weather_query"}"#),
			Err(ParseFailure::UnknownIntent("weather_query".to_string()))
		);
		assert!(matches!(parse_intent_reply("{intent: faq}"), Err(ParseFailure::InvalidJson(_))));
	}

	#[test]
	fn fallback_follows_keyword_priority() {
		assert_eq!(fallback_intent("查詢客戶的訂單").intent, Intent::CustomerQuery);
		assert_eq!(fallback_intent("Show my ORDER status").intent, Intent::OrderQuery);
		assert_eq!(fallback_intent("常見問題有哪些").intent, Intent::FaqQuery);
		assert_eq!(fallback_intent("精選知識庫文章").intent, Intent::KnowledgeBaseQuery);
		assert_eq!(fallback_intent("如何建立客服工單").intent, Intent::TicketManagementQuery);
	}

	#[test]
	fn fallback_defaults_to_general_info() {
		let result = fallback_intent("");

		assert_eq!(result.intent, Intent::GeneralInfo);
		assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
		assert!(result.entities.is_empty());
	}

	#[test]
	fn only_customer_service_intents_are_supported() {
		let supported: Vec<Intent> = Intent::CATEGORIES
			.iter()
			.map(|(intent, _)| *intent)
			.filter(|intent| intent.is_supported())
			.collect();

		assert_eq!(
			supported,
			vec![Intent::FaqQuery, Intent::KnowledgeBaseQuery, Intent::TicketManagementQuery]
		);
		assert!(!Intent::GeneralInfo.is_supported());
	}
}
