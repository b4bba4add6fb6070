use std::sync::Arc;

use ragdesk_providers::line::LineClient;
use ragdesk_service::RagService;
use ragdesk_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RagService>,
	/// Present only when a `[line]` section is configured.
	pub line: Option<Arc<LineBot>>,
}
impl AppState {
	/// Connects to Postgres and Qdrant and creates any missing knowledge collection.
	pub async fn new(config: ragdesk_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;
		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let service = RagService::new(config, db, qdrant);

		service.knowledge.ensure_collections().await?;

		Self::from_service(service)
	}

	/// Wraps an already wired service. The LINE client is built from `service.cfg.line`.
	pub fn from_service(service: RagService) -> color_eyre::Result<Self> {
		let line = service
			.cfg
			.line
			.as_ref()
			.map(|cfg| -> color_eyre::Result<_> {
				Ok(Arc::new(LineBot {
					channel_secret: cfg.channel_secret.clone(),
					client: LineClient::new(cfg)?,
				}))
			})
			.transpose()?;

		Ok(Self { service: Arc::new(service), line })
	}
}

/// Credentials and client for one LINE channel.
pub struct LineBot {
	pub channel_secret: String,
	pub client: LineClient,
}
