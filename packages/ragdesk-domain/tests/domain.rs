use ragdesk_domain::{
	intent::{self, Intent},
	records::ExampleRecord,
	similarity, sql_extract, sql_gate,
	sql_gate::GateRejection,
};

#[test]
fn adversarial_model_output_never_passes_the_gate() {
	let reply = "好的！\n```sql\nDROP TABLE customers_customer;\n```";
	let sql = sql_extract::extract_sql(reply).expect("Fence should be extracted.");

	assert_eq!(sql_gate::inspect(&sql), Err(GateRejection::NotSelect));
}

#[test]
fn extracted_select_passes_the_gate() {
	let reply = "SQL 如下：\nSELECT question, answer FROM customer_service_faq\nWHERE is_active = true\nORDER BY is_featured DESC, sort_order ASC\nLIMIT 10;";
	let sql = sql_extract::extract_sql(reply).expect("Lines should be extracted.");

	assert!(sql.to_uppercase().trim().starts_with("SELECT"));
	assert_eq!(sql_gate::inspect(&sql), Ok(()));
}

#[test]
fn static_seed_question_matches_itself() {
	let example = ExampleRecord::new(
		"faq_query",
		"如何修改密碼",
		"",
		"請到個人設定頁面，點選「修改密碼」，輸入舊密碼和新密碼即可完成修改。",
	);

	assert!(example.is_static());
	assert!(similarity::is_similar("如何修改密碼", &example.natural_query, 0.6));
}

#[test]
fn unparseable_reply_falls_back_to_keywords() {
	let result = intent::parse_intent_reply("I think this is about FAQ.")
		.unwrap_or_else(|_| intent::fallback_intent("顯示所有常見問題"));

	assert_eq!(result.intent, Intent::FaqQuery);
	assert_eq!(result.reasoning, "關鍵字匹配");
}
