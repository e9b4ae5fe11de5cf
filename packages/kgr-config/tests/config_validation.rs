use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::{Table, Value};

use kgr_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_table() -> Table {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn section<'a>(root: &'a mut Table, path: &[&str]) -> &'a mut Table {
	let mut table = root;

	for key in path {
		table = table
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{key}]."));
	}

	table
}

fn render(table: &Table) -> String {
	toml::to_string(table).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("kgr_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_table(table: &Table) -> kgr_config::Result<Config> {
	let path = write_temp_config(render(table));
	let result = kgr_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_invalid(table: &Table, field: &str) -> String {
	let err = load_table(table).expect_err("Expected validation error.");

	assert_eq!(err.field(), Some(field), "Unexpected error: {err}");

	err.to_string()
}

#[test]
fn sample_config_loads_with_defaults() {
	let cfg = load_table(&sample_table()).expect("Sample config must load.");

	assert_eq!(cfg.search.default_limit, 10);
	assert_eq!(cfg.search.expansion.max_hops, 2);
	assert_eq!(cfg.search.expansion.max_entities, None);
	assert_eq!(cfg.search.timeout_ms, None);
	assert_eq!(cfg.storage.qdrant.vector_dim, 1_536);
	assert_eq!(cfg.context.max_relations, 50);
	assert_eq!(cfg.context.max_entity_chars, 2_000);
}

#[test]
fn blank_api_auth_token_is_normalized_to_none() {
	let cfg = load_table(&sample_table()).expect("Sample config must load.");

	assert!(cfg.security.api_auth_token.is_none());
}

#[test]
fn missing_search_and_context_sections_fall_back_to_defaults() {
	let mut table = sample_table();

	table.remove("search");
	table.remove("context");

	let cfg = load_table(&table).expect("Config without optional sections must load.");

	assert_eq!(cfg.search.default_limit, 10);
	assert_eq!(cfg.search.max_limit, 100);
	assert_eq!(cfg.search.vector_latency_warn_ms, 1_000);
	assert_eq!(cfg.context.max_hits, 10);
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let mut table = sample_table();

	section(&mut table, &["providers", "embedding"])
		.insert("dimensions".to_string(), Value::Integer(768));

	let message = expect_invalid(&table, "providers.embedding.dimensions");

	assert!(message.contains("must match storage.qdrant.vector_dim"), "Unexpected: {message}");
}

#[test]
fn embedding_api_key_must_be_non_empty() {
	let mut table = sample_table();

	section(&mut table, &["providers", "embedding"])
		.insert("api_key".to_string(), Value::String("   ".to_string()));

	expect_invalid(&table, "providers.embedding.api_key");
}

#[test]
fn max_hops_outside_one_or_two_is_rejected() {
	for hops in [0, 3] {
		let mut table = sample_table();

		section(&mut table, &["search", "expansion"])
			.insert("max_hops".to_string(), Value::Integer(hops));

		let message = expect_invalid(&table, "search.expansion.max_hops");

		assert_eq!(message, "search.expansion.max_hops must be 1 or 2.");
	}
}

#[test]
fn max_hops_of_one_is_accepted_as_the_expand_default() {
	let mut table = sample_table();

	section(&mut table, &["search", "expansion"]).insert("max_hops".to_string(), Value::Integer(1));

	let cfg = load_table(&table).expect("max_hops = 1 must load.");

	assert_eq!(cfg.search.expansion.max_hops, 1);
}

#[test]
fn max_limit_below_default_limit_is_rejected() {
	let mut table = sample_table();

	section(&mut table, &["search"]).insert("max_limit".to_string(), Value::Integer(5));

	expect_invalid(&table, "search.max_limit");
}

#[test]
fn zero_timeout_is_rejected() {
	let mut table = sample_table();

	section(&mut table, &["search"]).insert("timeout_ms".to_string(), Value::Integer(0));

	expect_invalid(&table, "search.timeout_ms");
}

#[test]
fn zero_expansion_cap_is_rejected() {
	let mut table = sample_table();

	section(&mut table, &["search", "expansion"])
		.insert("max_entities".to_string(), Value::Integer(0));

	expect_invalid(&table, "search.expansion.max_entities");
}

#[test]
fn zero_context_budget_is_rejected() {
	for field in ["max_relations", "max_entity_chars"] {
		let mut table = sample_table();

		section(&mut table, &["context"]).insert(field.to_string(), Value::Integer(0));

		expect_invalid(&table, &format!("context.{field}"));
	}
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("kgr_config_test_missing_file.toml");
	let err = kgr_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
	assert!(err.field().is_none());
}

#[test]
fn malformed_toml_reports_parse_error() {
	let path = write_temp_config("[service\nhttp_bind = ".to_string());
	let result = kgr_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	assert!(matches!(result, Err(Error::ParseConfig { .. })));
}
