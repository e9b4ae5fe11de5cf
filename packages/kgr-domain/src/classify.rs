use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
	Semantic,
	Structural,
	Exact,
	Hybrid,
}
impl QueryType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Semantic => "semantic",
			Self::Structural => "structural",
			Self::Exact => "exact",
			Self::Hybrid => "hybrid",
		}
	}

	/// Whether the orchestrator expands vector hits through the graph for this strategy.
	pub fn needs_graph(self) -> bool {
		!matches!(self, Self::Exact)
	}
}
impl fmt::Display for QueryType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for QueryType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"semantic" => Ok(Self::Semantic),
			"structural" => Ok(Self::Structural),
			"exact" => Ok(Self::Exact),
			"hybrid" => Ok(Self::Hybrid),
			_ => Err(Error::UnknownQueryType { value: s.to_string() }),
		}
	}
}

struct Rule {
	query_type: QueryType,
	phrases: &'static [&'static [&'static str]],
}

// Evaluated top to bottom; the first rule with a matching phrase decides. Keywords overlap on
// ambiguous queries, so the order is part of the contract.
const RULES: [Rule; 3] = [
	Rule { query_type: QueryType::Semantic, phrases: &[&["similar"], &["like"]] },
	Rule { query_type: QueryType::Structural, phrases: &[&["pathway"], &["mechanism"]] },
	Rule { query_type: QueryType::Exact, phrases: &[&["list", "all"], &["show", "all"]] },
];

/// Picks the retrieval strategy for a raw query. Pure and case-insensitive; keywords match whole
/// words only, and anything unmatched (including the empty string) is hybrid.
pub fn classify(query: &str) -> QueryType {
	let tokens = tokenize(query);

	RULES
		.iter()
		.find(|rule| rule.phrases.iter().any(|phrase| contains_phrase(&tokens, phrase)))
		.map(|rule| rule.query_type)
		.unwrap_or(QueryType::Hybrid)
}

fn tokenize(query: &str) -> Vec<String> {
	query
		.split(|c: char| !c.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(str::to_lowercase)
		.collect()
}

fn contains_phrase(tokens: &[String], phrase: &[&str]) -> bool {
	if phrase.is_empty() || tokens.len() < phrase.len() {
		return false;
	}

	tokens.windows(phrase.len()).any(|window| window.iter().zip(phrase).all(|(a, b)| a == b))
}
