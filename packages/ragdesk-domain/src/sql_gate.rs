use std::{fmt, sync::LazyLock};

use regex::Regex;

pub const FORBIDDEN_KEYWORDS: [&str; 7] =
	["DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE"];

static FORBIDDEN_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
	FORBIDDEN_KEYWORDS
		.iter()
		.map(|keyword| {
			let pattern = format!(r"(?i)\b{keyword}\b");

			(*keyword, Regex::new(&pattern).expect("Keyword pattern must compile."))
		})
		.collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
	/// The statement does not begin with `SELECT`.
	NotSelect,
	/// A write or DDL keyword appears as a whole word.
	ForbiddenKeyword(&'static str),
}
impl GateRejection {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::NotSelect => "REJECT_NOT_SELECT",
			Self::ForbiddenKeyword(_) => "REJECT_FORBIDDEN_KEYWORD",
		}
	}
}
impl fmt::Display for GateRejection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotSelect => f.write_str("Only SELECT statements may be executed."),
			Self::ForbiddenKeyword(keyword) =>
				write!(f, "Statement contains the forbidden keyword {keyword}."),
		}
	}
}
impl std::error::Error for GateRejection {}

/// Decides whether a candidate statement may reach the database.
///
/// Keywords are matched on word boundaries, so identifiers such as `created_at` or
/// `updated_by_id` pass while `DROP TABLE` does not.
pub fn inspect(sql: &str) -> Result<(), GateRejection> {
	let normalized = sql.trim().to_uppercase();

	if !normalized.starts_with("SELECT") {
		return Err(GateRejection::NotSelect);
	}

	for (keyword, pattern) in FORBIDDEN_PATTERNS.iter() {
		if pattern.is_match(&normalized) {
			return Err(GateRejection::ForbiddenKeyword(*keyword));
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_plain_select() {
		assert_eq!(
			inspect("  select question, answer from customer_service_faq where is_active = true"),
			Ok(())
		);
	}

	#[test]
	fn rejects_statements_that_do_not_start_with_select() {
		for sql in [
			"DROP TABLE customers_customer;",
			"",
			"   ",
			"WITH x AS (SELECT 1) SELECT * FROM x",
			"EXPLAIN SELECT 1",
			"-- comment\nSELECT 1",
		] {
			assert_eq!(inspect(sql), Err(GateRejection::NotSelect), "sql: {sql:?}");
		}
	}

	#[test]
	fn rejects_stacked_destructive_statements() {
		assert_eq!(
			inspect("SELECT 1; DROP TABLE customers_customer"),
			Err(GateRejection::ForbiddenKeyword("DROP"))
		);
		assert_eq!(
			inspect("select * from t; delete from t"),
			Err(GateRejection::ForbiddenKeyword("DELETE"))
		);
		assert_eq!(
			inspect("SELECT * FROM t WHERE x IN (SELECT 1);TRUNCATE t"),
			Err(GateRejection::ForbiddenKeyword("TRUNCATE"))
		);
	}

	#[test]
	fn identifiers_containing_keywords_pass() {
		let sql = "SELECT ticket_number, created_at, updated_at, created_by_id, updated_by_id \
			FROM customer_service_serviceticket WHERE is_deleted = false ORDER BY created_at DESC";

		assert_eq!(inspect(sql), Ok(()));
	}

	#[test]
	fn keywords_inside_string_literals_are_still_rejected() {
		assert_eq!(
			inspect("SELECT question FROM customer_service_faq WHERE question LIKE '%update%'"),
			Err(GateRejection::ForbiddenKeyword("UPDATE"))
		);
	}
}
