use serde_json::Value;
use sqlx::{PgPool, postgres::PgPoolOptions, types::Json};

use crate::{Error, Result, Row};

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &ragdesk_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	/// Runs a single SELECT and returns every row as a JSON object.
	///
	/// The statement is wrapped as a subquery fed to `row_to_json`, so column names and order come
	/// straight from the select list. With `read_only` the transaction is marked
	/// `READ ONLY` and Postgres refuses any write the statement attempts. The transaction is always
	/// rolled back.
	pub async fn fetch_rows(&self, sql: &str, read_only: bool) -> Result<Vec<Row>> {
		let wrapped = wrap_row_to_json(sql);
		let mut tx = self.pool.begin().await?;

		if read_only {
			sqlx::query("SET TRANSACTION READ ONLY").execute(&mut *tx).await?;
		}

		let rows: Vec<Json<Value>> =
			sqlx::query_scalar(wrapped.as_str()).fetch_all(&mut *tx).await?;

		tx.rollback().await?;

		rows.into_iter()
			.map(|Json(row)| match row {
				Value::Object(map) => Ok(map),
				other => Err(Error::InvalidRow(format!("Expected a JSON object, got {other}."))),
			})
			.collect()
	}
}

pub fn strip_trailing_semicolons(sql: &str) -> &str {
	sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

fn wrap_row_to_json(sql: &str) -> String {
	format!("SELECT row_to_json(q) AS row FROM (\n{}\n) AS q", strip_trailing_semicolons(sql))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trailing_semicolons_are_removed() {
		assert_eq!(strip_trailing_semicolons("SELECT 1;"), "SELECT 1");
		assert_eq!(strip_trailing_semicolons("  SELECT 1 ; ;\n"), "SELECT 1");
		assert_eq!(strip_trailing_semicolons("SELECT ';'"), "SELECT ';'");
	}

	#[test]
	fn statement_is_wrapped_as_subquery() {
		let wrapped = wrap_row_to_json("SELECT id, name FROM customers_customer LIMIT 10;");

		assert_eq!(
			wrapped,
			"SELECT row_to_json(q) AS row FROM (\nSELECT id, name FROM customers_customer LIMIT 10\n) AS q"
		);
	}
}
