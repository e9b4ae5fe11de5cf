pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
	#[error("Relation {relation_id} references entity {entity_id}, which is not in the subgraph.")]
	DanglingRelation { relation_id: String, entity_id: String },
	#[error("Unknown query type {value:?}; expected semantic, structural, exact, or hybrid.")]
	UnknownQueryType { value: String },
}
