//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository traits; AppState pins them to the
//! SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;

use medconsult_core::llm::box_provider::BoxLlmProvider;
use medconsult_core::memory::box_embedder::BoxEmbedder;
use medconsult_core::service::consultation::ConsultationService;
use medconsult_core::service::records::RecordService;
use medconsult_infra::config::{database_url, load_config, resolve_data_dir};
use medconsult_infra::embedding::create_embedder;
use medconsult_infra::llm::create_provider;
use medconsult_infra::sqlite::condition::SqliteConditionRepository;
use medconsult_infra::sqlite::consultation::SqliteConsultationRepository;
use medconsult_infra::sqlite::pool::DatabasePool;
use medconsult_infra::sqlite::timeline::SqliteTimelineRepository;
use medconsult_infra::sqlite::user::SqliteUserRepository;
use medconsult_infra::sqlite::vitals::SqliteVitalsRepository;
use medconsult_types::config::MedConsultConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteRecordService = RecordService<
    SqliteUserRepository,
    SqliteConsultationRepository,
    SqliteTimelineRepository,
    SqliteConditionRepository,
    SqliteVitalsRepository,
>;

pub type ConcreteConsultationService = ConsultationService<
    SqliteConsultationRepository,
    SqliteTimelineRepository,
    SqliteConditionRepository,
>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<ConcreteRecordService>,
    pub consultations: Arc<ConcreteConsultationService>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, build providers.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        let provider = create_provider(&config.generation);
        let embedder = create_embedder(&config.embedding)?;

        tracing::debug!(
            data_dir = %data_dir.display(),
            provider = provider.name(),
            embedding_model = embedder.model_name(),
            "application state initialized"
        );
        Ok(Self::from_parts(db_pool, provider, embedder, config, data_dir))
    }

    /// Wire services from already-constructed parts.
    pub fn from_parts(
        db_pool: DatabasePool,
        provider: BoxLlmProvider,
        embedder: BoxEmbedder,
        config: MedConsultConfig,
        data_dir: PathBuf,
    ) -> Self {
        let records = RecordService::new(
            SqliteUserRepository::new(db_pool.clone()),
            SqliteConsultationRepository::new(db_pool.clone()),
            SqliteTimelineRepository::new(db_pool.clone()),
            SqliteConditionRepository::new(db_pool.clone()),
            SqliteVitalsRepository::new(db_pool.clone()),
        );

        let consultations = ConsultationService::new(
            SqliteConsultationRepository::new(db_pool.clone()),
            SqliteTimelineRepository::new(db_pool.clone()),
            SqliteConditionRepository::new(db_pool),
            Arc::new(provider),
            Arc::new(embedder),
            config,
        );

        Self {
            records: Arc::new(records),
            consultations: Arc::new(consultations),
            data_dir,
        }
    }
}
