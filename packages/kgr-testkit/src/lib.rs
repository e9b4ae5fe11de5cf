//! Throwaway Postgres databases and Qdrant collections for integration tests.
//!
//! Tests that need live backends read `KGR_PG_DSN` (and optionally `KGR_QDRANT_URL`) and skip
//! themselves when unset.

mod error;

pub use error::{Error, Result};

use std::{env, future::Future, str::FromStr, sync::Mutex, thread, time::Duration};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::{runtime::Builder, time};
use uuid::Uuid;

pub const PG_DSN_ENV: &str = "KGR_PG_DSN";
pub const QDRANT_URL_ENV: &str = "KGR_QDRANT_URL";

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];
const QDRANT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// A uniquely named database, dropped together with any collections handed out by
/// [`TestDatabase::collection_name`].
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	collections: Mutex<Vec<String>>,
	dropped: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::setup("Failed to parse KGR_PG_DSN", err))?;
		let (admin_options, mut admin_conn) = connect_admin(&base_options).await?;
		let name = format!("kgr_test_{}", Uuid::new_v4().simple());

		admin_conn
			.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| Error::setup("Failed to create test database", err))?;

		let dsn = base_options.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin_options, collections: Mutex::new(Vec::new()), dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns a collection name scoped to this database and schedules it for deletion.
	pub fn collection_name(&self, prefix: &str) -> String {
		let collection = format!("{prefix}_{}", self.name);
		let mut tracked = self.collections.lock().unwrap_or_else(|err| err.into_inner());

		if !tracked.contains(&collection) {
			tracked.push(collection.clone());
		}

		collection
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.drop_resources().await
	}

	fn tracked_collections(&self) -> Vec<String> {
		self.collections.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	async fn drop_resources(&mut self) -> Result<()> {
		if self.dropped {
			return Ok(());
		}

		let collections = self.tracked_collections();
		let qdrant_result = drop_collections(&collections).await;

		drop_database(&self.name, &self.admin_options).await?;
		qdrant_result?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		let collections = self.tracked_collections();
		// Drop may run inside a Tokio runtime, so the async cleanup gets its own thread.
		let worker = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test cleanup failed to start a runtime: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(drop_collections(&collections)) {
				eprintln!("Test Qdrant cleanup failed: {err}");
			}
			if let Err(err) = runtime.block_on(drop_database(&name, &admin_options)) {
				eprintln!("Test database cleanup failed: {err}");
			}
		});
		let _ = worker.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var(PG_DSN_ENV).ok().filter(|value| !value.trim().is_empty())
}

pub fn env_qdrant_url() -> Option<String> {
	env::var(QDRANT_URL_ENV).ok().filter(|value| !value.trim().is_empty())
}

/// Runs `f` against a fresh database and drops it afterwards, whatever `f` returned.
pub async fn with_test_db<F, Fut, T>(base_dsn: &str, f: F) -> Result<T>
where
	F: FnOnce(&TestDatabase) -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let mut db = TestDatabase::new(base_dsn).await?;
	let result = f(&db).await;

	if let Err(err) = db.drop_resources().await {
		eprintln!("Test database cleanup warning: {err}");

		if result.is_ok() {
			return Err(err);
		}
	}

	result
}

async fn connect_admin(
	base_options: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base_options.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last_err = Some(err),
		}
	}

	Err(Error::setup(
		"Failed to connect to an admin database",
		last_err.map(|err| err.to_string()).unwrap_or_default(),
	))
}

async fn drop_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options)
		.await
		.map_err(|err| Error::setup("Failed to connect for cleanup", err))?;
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	sqlx::query(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str())
		.execute(&mut conn)
		.await
		.map_err(|err| Error::setup("Failed to drop test database", err))?;

	Ok(())
}

async fn drop_collections(collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let Some(qdrant_url) = env_qdrant_url() else {
		eprintln!("Skipping Qdrant cleanup; set {QDRANT_URL_ENV} to delete test collections.");

		return Ok(());
	};
	let client = Qdrant::from_url(&qdrant_url).build()?;

	for collection in collections {
		let exists = time::timeout(QDRANT_CALL_TIMEOUT, client.collection_exists(collection.clone()))
			.await
			.map_err(|err| Error::setup("Qdrant collection_exists timed out", err))??;

		if !exists {
			continue;
		}

		time::timeout(QDRANT_CALL_TIMEOUT, client.delete_collection(collection.clone()))
			.await
			.map_err(|err| Error::setup("Qdrant delete_collection timed out", err))??;
	}

	Ok(())
}
