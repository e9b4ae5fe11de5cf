use serde_json::json;

use kgr_config::Postgres;
use kgr_storage::{
	db::Db,
	graph::{self, Traversal},
	models::{EntityRow, RelationRow},
};
use kgr_testkit::TestDatabase;

async fn bootstrap(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

fn entity(id: &str, label: &str) -> EntityRow {
	EntityRow {
		entity_id: id.to_string(),
		labels: vec![label.to_string()],
		display_name: id.to_uppercase(),
		properties: json!({ "source": "fixture" }),
	}
}

fn relation(id: &str, from: &str, to: &str) -> RelationRow {
	RelationRow {
		relation_id: id.to_string(),
		relation_type: "INTERACTS_WITH".to_string(),
		from_entity_id: from.to_string(),
		to_entity_id: to.to_string(),
		properties: json!({}),
	}
}

// a - b - c - d, with b - x pointing back towards b.
async fn load_chain(db: &Db) {
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	for id in ["a", "b", "c", "d", "x"] {
		graph::upsert_entity(&mut conn, &entity(id, "Protein"))
			.await
			.expect("Failed to upsert entity.");
	}
	for (id, from, to) in [("r1", "a", "b"), ("r2", "b", "c"), ("r3", "c", "d"), ("r4", "x", "b")] {
		graph::upsert_relation(&mut conn, &relation(id, from, to))
			.await
			.expect("Failed to upsert relation.");
	}
}

fn entity_hops(traversal: &Traversal) -> Vec<(String, i32)> {
	traversal
		.entities
		.iter()
		.map(|reached| (reached.entity.entity_id.clone(), reached.hop))
		.collect()
}

fn relation_ids(traversal: &Traversal) -> Vec<&str> {
	traversal.relations.iter().map(|relation| relation.relation_id.as_str()).collect()
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set KGR_PG_DSN to run."]
async fn schema_bootstrap_is_repeatable() {
	let Some(base_dsn) = kgr_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstrap_is_repeatable; set KGR_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	db.ensure_schema().await.expect("Second schema bootstrap must succeed.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM information_schema.tables WHERE table_name IN ('kg_entities', 'kg_relations')",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set KGR_PG_DSN to run."]
async fn traversal_reports_minimum_hops_in_both_directions() {
	let Some(base_dsn) = kgr_testkit::env_dsn() else {
		eprintln!("Skipping traversal_reports_minimum_hops_in_both_directions; set KGR_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	load_chain(&db).await;

	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let one_hop = graph::traverse(&mut conn, &["a".to_string()], 1).await.expect("Traversal failed.");

	assert_eq!(entity_hops(&one_hop), vec![("a".to_string(), 0), ("b".to_string(), 1)]);
	assert_eq!(relation_ids(&one_hop), vec!["r1"]);

	let two_hops =
		graph::traverse(&mut conn, &["a".to_string()], 2).await.expect("Traversal failed.");

	assert_eq!(
		entity_hops(&two_hops),
		vec![
			("a".to_string(), 0),
			("b".to_string(), 1),
			("c".to_string(), 2),
			("x".to_string(), 2),
		]
	);
	assert_eq!(relation_ids(&two_hops), vec!["r1", "r2", "r4"]);

	drop(conn);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set KGR_PG_DSN to run."]
async fn unknown_seeds_and_empty_seed_sets_yield_nothing() {
	let Some(base_dsn) = kgr_testkit::env_dsn() else {
		eprintln!("Skipping unknown_seeds_and_empty_seed_sets_yield_nothing; set KGR_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	load_chain(&db).await;

	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let empty = graph::traverse(&mut conn, &[], 2).await.expect("Traversal failed.");

	assert!(empty.entities.is_empty() && empty.relations.is_empty());

	let unknown =
		graph::traverse(&mut conn, &["missing".to_string()], 2).await.expect("Traversal failed.");

	assert!(unknown.entities.is_empty() && unknown.relations.is_empty());

	drop(conn);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set KGR_PG_DSN to run."]
async fn upserts_overwrite_existing_rows() {
	let Some(base_dsn) = kgr_testkit::env_dsn() else {
		eprintln!("Skipping upserts_overwrite_existing_rows; set KGR_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let mut row = entity("aspirin", "Drug");

	graph::upsert_entity(&mut conn, &row).await.expect("Failed to insert entity.");

	row.display_name = "Acetylsalicylic acid".to_string();

	graph::upsert_entity(&mut conn, &row).await.expect("Failed to update entity.");

	let traversal =
		graph::traverse(&mut conn, &["aspirin".to_string()], 1).await.expect("Traversal failed.");

	assert_eq!(traversal.entities.len(), 1);
	assert_eq!(traversal.entities[0].entity.display_name, "Acetylsalicylic acid");

	let err = graph::upsert_entity(&mut conn, &entity("  ", "Drug"))
		.await
		.expect_err("Blank entity IDs must be rejected.");

	assert!(!err.is_unavailable());

	drop(conn);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
