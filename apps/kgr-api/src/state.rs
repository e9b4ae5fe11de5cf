use std::sync::Arc;

use kgr_config::Config;
use kgr_providers::EmbeddingClient;
use kgr_service::{KgrService, Providers};
use kgr_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<KgrService>,
	/// Bearer token required on `/v1/*` when configured.
	pub auth_token: Option<Arc<str>>,
}
impl AppState {
	/// Connects every backend once; the pools and clients live as long as the process.
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		let embedding = EmbeddingClient::new(&config.providers.embedding)?;
		let providers = Providers::new(Arc::new(embedding), Arc::new(qdrant), Arc::new(db));

		Ok(Self::from_service(KgrService::new(config, providers)))
	}

	pub fn from_service(service: KgrService) -> Self {
		let auth_token = service.cfg.security.api_auth_token.as_deref().map(Arc::from);

		Self { service: Arc::new(service), auth_token }
	}
}
