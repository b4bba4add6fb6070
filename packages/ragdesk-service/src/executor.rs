use ragdesk_storage::{Row, db::Db};

use crate::{BoxFuture, QueryExecutor, Result};

pub struct PgQueryExecutor {
	db: Db,
	read_only: bool,
}
impl PgQueryExecutor {
	pub fn new(db: Db, read_only: bool) -> Self {
		Self { db, read_only }
	}
}

impl QueryExecutor for PgQueryExecutor {
	fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<Vec<Row>>> {
		Box::pin(async move { Ok(self.db.fetch_rows(sql, self.read_only).await?) })
	}
}
