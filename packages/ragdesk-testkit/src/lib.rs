//! Scratch Postgres databases and Qdrant collections for integration tests.
//!
//! Tests read `RAGDESK_PG_DSN` and `RAGDESK_QDRANT_URL` and skip themselves when either is
//! missing.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, sync::Mutex, time::Duration};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::time;
use uuid::Uuid;

/// Databases tried, in order, when connecting to issue `CREATE DATABASE`.
const MAINTENANCE_DATABASES: [&str; 2] = ["postgres", "template1"];
const QDRANT_TIMEOUT: Duration = Duration::from_secs(10);

/// A trimmed copy of the support tables with a handful of rows, enough to run the seeded example
/// queries against.
const CRM_FIXTURE_SQL: &str = "\
CREATE TABLE customers_customer (
	id SERIAL PRIMARY KEY,
	first_name TEXT NOT NULL,
	last_name TEXT NOT NULL,
	email TEXT NOT NULL UNIQUE,
	phone TEXT,
	company TEXT,
	created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE TABLE customer_service_faq (
	id SERIAL PRIMARY KEY,
	question TEXT NOT NULL,
	answer TEXT NOT NULL,
	is_active BOOLEAN NOT NULL DEFAULT TRUE,
	is_featured BOOLEAN NOT NULL DEFAULT FALSE,
	sort_order INTEGER NOT NULL DEFAULT 0,
	view_count INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE customer_service_serviceticket (
	id SERIAL PRIMARY KEY,
	ticket_number TEXT NOT NULL,
	customer_id INTEGER REFERENCES customers_customer (id),
	title TEXT NOT NULL,
	status TEXT NOT NULL,
	priority TEXT NOT NULL,
	created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
INSERT INTO customers_customer (first_name, last_name, email, company)
VALUES ('小明', '王', 'ming@example.com', '台積電');
INSERT INTO customer_service_faq (question, answer, is_featured, sort_order)
VALUES
	('如何修改密碼', '請到個人設定頁面修改。', TRUE, 1),
	('如何申請退款', '請聯繫客服專線。', FALSE, 2);
INSERT INTO customer_service_serviceticket (ticket_number, customer_id, title, status, priority)
VALUES ('T-0001', 1, '無法登入', 'open', 'high');";

pub fn env_dsn() -> Option<String> {
	env::var("RAGDESK_PG_DSN").ok()
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("RAGDESK_QDRANT_URL").ok()
}

/// A uniquely named database created from a base DSN. Call [`TestDatabase::cleanup`] at the end
/// of the test; a database that is dropped without it is reported on stderr and left behind.
pub struct TestDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
	collections: Mutex<Vec<String>>,
	cleaned: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn).map_err(|err| Error::Setup {
			message: format!("RAGDESK_PG_DSN is not a valid Postgres DSN: {err}."),
		})?;
		let (maintenance, mut conn) = connect_maintenance(&base).await?;
		let name = format!("ragdesk_test_{}", Uuid::new_v4().simple());

		sqlx::raw_sql(&format!(r#"CREATE DATABASE "{name}""#)).execute(&mut conn).await?;
		conn.close().await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance, collections: Mutex::new(Vec::new()), cleaned: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// A collection name unique to this database. It is deleted by [`TestDatabase::cleanup`].
	pub fn collection_name(&self, prefix: &str) -> String {
		let collection = format!("{prefix}_{}", self.name);

		self.collections.lock().unwrap_or_else(|err| err.into_inner()).push(collection.clone());

		collection
	}

	/// Creates the customer, FAQ, and ticket tables with sample rows.
	pub async fn load_crm_fixture(&self) -> Result<()> {
		let options = PgConnectOptions::from_str(&self.dsn)
			.map_err(|err| Error::Setup { message: format!("Test DSN did not parse: {err}.") })?;
		let mut conn = PgConnection::connect_with(&options).await?;

		sqlx::raw_sql(CRM_FIXTURE_SQL).execute(&mut conn).await?;
		conn.close().await?;

		Ok(())
	}

	/// Deletes tracked collections, then drops the database. Both are attempted even if the
	/// first fails.
	pub async fn cleanup(mut self) -> Result<()> {
		let collections =
			std::mem::take(&mut *self.collections.lock().unwrap_or_else(|err| err.into_inner()));
		let qdrant = delete_collections(&collections).await;
		let postgres = drop_database(&self.name, &self.maintenance).await;

		self.cleaned = true;

		qdrant?;
		postgres
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if !self.cleaned {
			eprintln!("Test database {} was not cleaned up; drop it manually.", self.name);
		}
	}
}

async fn connect_maintenance(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut errors = Vec::new();

	for database in MAINTENANCE_DATABASES {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => errors.push(format!("{database}: {err}")),
		}
	}

	Err(Error::Setup {
		message: format!("No maintenance database accepted a connection ({}).", errors.join("; ")),
	})
}

async fn drop_database(name: &str, maintenance: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(maintenance).await?;

	// Pool connections from the test may still be open.
	sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await?;
	sqlx::raw_sql(&format!(r#"DROP DATABASE IF EXISTS "{name}""#)).execute(&mut conn).await?;
	conn.close().await?;

	Ok(())
}

async fn delete_collections(collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let Some(url) = env_qdrant_url() else {
		eprintln!("RAGDESK_QDRANT_URL is unset; leaving collections {collections:?} in place.");

		return Ok(());
	};
	let client = Qdrant::from_url(&url)
		.build()
		.map_err(|err| Error::Qdrant { message: err.to_string() })?;

	for collection in collections {
		match time::timeout(QDRANT_TIMEOUT, client.delete_collection(collection.clone())).await {
			Ok(Ok(_)) => {},
			Ok(Err(err)) =>
				return Err(Error::Qdrant { message: format!("{collection}: {err}") }),
			Err(_) =>
				return Err(Error::Qdrant { message: format!("{collection}: timed out") }),
		}
	}

	Ok(())
}
