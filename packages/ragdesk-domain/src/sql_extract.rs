use std::sync::LazyLock;

use regex::Regex;

/// A single way of pulling a statement out of a model reply.
pub type Strategy = fn(&str) -> Option<String>;

/// Strategies in the order they are tried. The first one that yields a statement wins.
pub const STRATEGIES: [(&str, Strategy); 4] = [
	("sql_fence", sql_fence),
	("select_fence", select_fence),
	("select_lines", select_lines),
	("whole_reply", whole_reply),
];

static SQL_FENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?is)```sql\s*(.*?)\s*```").expect("SQL fence pattern must compile.")
});
static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?s)```\s*(.*?)\s*```").expect("Code fence pattern must compile.")
});

/// Returns the extracted statement and the name of the strategy that produced it.
pub fn extract_sql_with_strategy(reply: &str) -> Option<(&'static str, String)> {
	STRATEGIES.iter().find_map(|(name, strategy)| strategy(reply).map(|sql| (*name, sql)))
}

pub fn extract_sql(reply: &str) -> Option<String> {
	extract_sql_with_strategy(reply).map(|(_, sql)| sql)
}

/// A fenced block tagged `sql`.
pub fn sql_fence(reply: &str) -> Option<String> {
	let captures = SQL_FENCE.captures(reply)?;

	Some(captures.get(1)?.as_str().trim().to_string())
}

/// The first untagged fenced block, kept only when it reads as a `SELECT`.
pub fn select_fence(reply: &str) -> Option<String> {
	let captures = ANY_FENCE.captures(reply)?;
	let candidate = captures.get(1)?.as_str().trim();

	starts_with_select(candidate).then(|| candidate.to_string())
}

/// Lines from the first `SELECT` line through the first line ending in `;`.
pub fn select_lines(reply: &str) -> Option<String> {
	let mut lines = reply.lines().map(str::trim);
	let first = lines.find(|line| starts_with_select(line))?;
	let mut collected = vec![first];

	if !first.ends_with(';') {
		for line in lines {
			collected.push(line);

			if line.ends_with(';') {
				break;
			}
		}
	}

	let sql = collected.join("\n");
	let sql = sql.trim();

	if sql.ends_with(';') { Some(sql.to_string()) } else { Some(format!("{sql};")) }
}

/// The whole reply, when the model answered with nothing but the statement.
pub fn whole_reply(reply: &str) -> Option<String> {
	let trimmed = reply.trim();

	starts_with_select(trimmed).then(|| trimmed.to_string())
}

fn starts_with_select(text: &str) -> bool {
	text.get(..6).map(|head| head.eq_ignore_ascii_case("SELECT")).unwrap_or(false)
}
