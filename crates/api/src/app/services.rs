use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use docflow_core::{DocumentUploadId, TenantId};

use docflow_infra::config::OrchestratorConfig;
use docflow_infra::extraction::{ExtractionService, ScriptedExtraction, ThrottledExtraction};
use docflow_infra::object_store::{InMemoryObjectStore, LocalObjectStore, ObjectStore};
use docflow_infra::pause::ThreadPause;
use docflow_infra::profiles::{CachedProfiles, ExtractionProfile, InMemoryProfiles};
use docflow_infra::queue::InMemoryQueues;
use docflow_infra::registry::{InMemoryUploadRegistry, UploadEntry};
use docflow_infra::results::InMemoryResultStore;
use docflow_infra::scheduler::{ContinuationScheduler, InMemoryScheduler};
use docflow_infra::throttle;
use docflow_infra::{Orchestrator, Ports};

#[cfg(feature = "redis")]
use docflow_infra::{
    queue::RedisQueuePublisher, registry::PostgresUploadRegistry, results::PostgresResultStore,
    scheduler::RedisContinuationScheduler,
};
#[cfg(feature = "redis")]
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    InMemory,
    Persistent,
}

impl StoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreMode::InMemory => "in_memory",
            StoreMode::Persistent => "persistent",
        }
    }
}

pub struct AppServices {
    pub orchestrator: Arc<Orchestrator>,
    /// Source of due continuations for the pump.
    pub scheduler: Arc<dyn ContinuationScheduler>,
    pub mode: StoreMode,
}

impl AppServices {
    pub fn new(config: OrchestratorConfig, ports: Ports, mode: StoreMode) -> Self {
        let scheduler = ports.scheduler.clone();
        Self {
            orchestrator: Arc::new(Orchestrator::from_config(config, ports)),
            scheduler,
            mode,
        }
    }
}

pub async fn build_services(config: OrchestratorConfig) -> anyhow::Result<AppServices> {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        #[cfg(feature = "redis")]
        {
            return build_persistent_services(config).await;
        }
        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but redis feature not enabled, falling back to in-memory"
            );
        }
    }

    build_in_memory_services(config)
}

/// Extraction client with the outbound token bucket applied.
///
/// No vendor client ships with this crate; the scripted service accepts every
/// submission and replays `DOCFLOW_SIMULATED_STATUSES`.
fn extraction_client() -> Arc<dyn ExtractionService> {
    let statuses = std::env::var("DOCFLOW_SIMULATED_STATUSES")
        .unwrap_or_else(|_| "InProgress,InProgress,Success".to_string());
    let scripted = ScriptedExtraction::new().with_fallback(
        statuses
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>(),
    );

    Arc::new(ThrottledExtraction::new(
        scripted,
        throttle::default_quota(),
        ThreadPause,
    ))
}

/// `DOCFLOW_DEFAULT_PROJECT_ID` / `DOCFLOW_DEFAULT_PROFILE_ID` apply to every tenant.
fn profile_store() -> Arc<CachedProfiles<InMemoryProfiles>> {
    let mut profiles = InMemoryProfiles::new();
    if let (Ok(project_id), Ok(profile_id)) = (
        std::env::var("DOCFLOW_DEFAULT_PROJECT_ID"),
        std::env::var("DOCFLOW_DEFAULT_PROFILE_ID"),
    ) {
        profiles = profiles.with_fallback(ExtractionProfile {
            project_id,
            profile_id,
        });
    }
    Arc::new(CachedProfiles::with_default_capacity(profiles))
}

fn object_store() -> Arc<dyn ObjectStore> {
    match std::env::var("DOCFLOW_OBJECT_ROOT") {
        Ok(root) => Arc::new(LocalObjectStore::new(root)),
        Err(_) => Arc::new(InMemoryObjectStore::new()),
    }
}

/// One row of the `DOCFLOW_UPLOAD_FIXTURES` file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadFixture {
    document_upload_id: DocumentUploadId,
    tenant_id: TenantId,
    document_type: String,
    #[serde(default)]
    source_path: Option<String>,
}

/// Parse a JSON array of uploads into pending registry entries.
fn parse_upload_fixtures(raw: &str) -> anyhow::Result<Vec<UploadEntry>> {
    let fixtures: Vec<UploadFixture> =
        serde_json::from_str(raw).context("upload fixtures must be a JSON array of uploads")?;
    Ok(fixtures
        .into_iter()
        .map(|f| UploadEntry {
            source_path: f.source_path,
            ..UploadEntry::pending(f.document_upload_id, f.tenant_id, f.document_type)
        })
        .collect())
}

/// The in-memory registry starts empty unless `DOCFLOW_UPLOAD_FIXTURES`
/// names a fixture file; triggers for unregistered uploads are rejected.
fn seeded_registry() -> anyhow::Result<Arc<InMemoryUploadRegistry>> {
    let registry = Arc::new(InMemoryUploadRegistry::new());
    let Ok(path) = std::env::var("DOCFLOW_UPLOAD_FIXTURES") else {
        tracing::warn!("DOCFLOW_UPLOAD_FIXTURES not set; in-memory upload registry is empty");
        return Ok(registry);
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read upload fixtures from {path}"))?;
    let entries = parse_upload_fixtures(&raw)?;
    tracing::info!(path = %path, uploads = entries.len(), "seeded in-memory upload registry");
    for entry in entries {
        registry.insert(entry);
    }
    Ok(registry)
}

fn build_in_memory_services(config: OrchestratorConfig) -> anyhow::Result<AppServices> {
    // In-memory infra wiring (dev/test).
    let ports = Ports {
        extraction: extraction_client(),
        objects: object_store(),
        queues: Arc::new(InMemoryQueues::new()),
        scheduler: Arc::new(InMemoryScheduler::new()),
        registry: seeded_registry()?,
        results: Arc::new(InMemoryResultStore::new()),
        profiles: profile_store(),
        pause: Arc::new(ThreadPause),
    };

    Ok(AppServices::new(config, ports, StoreMode::InMemory))
}

#[cfg(feature = "redis")]
async fn build_persistent_services(config: OrchestratorConfig) -> anyhow::Result<AppServices> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

    let pool = PgPool::connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    let runtime = tokio::runtime::Handle::current();

    let registry = Arc::new(PostgresUploadRegistry::new(pool.clone(), runtime.clone()));
    let results = Arc::new(PostgresResultStore::new(pool, runtime));

    // Adapters block on the runtime, so schema setup runs off the async workers.
    {
        let registry = registry.clone();
        let results = results.clone();
        tokio::task::spawn_blocking(move || {
            registry.ensure_schema()?;
            results.ensure_schema()
        })
        .await
        .context("schema setup aborted")?
        .context("failed to create schema")?;
    }

    let queues = Arc::new(
        RedisQueuePublisher::new(&redis_url, None).context("failed to create Redis queue publisher")?,
    );
    let scheduler = Arc::new(
        RedisContinuationScheduler::new(&redis_url, None)
            .context("failed to create Redis continuation scheduler")?,
    );
    let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
        std::env::var("DOCFLOW_OBJECT_ROOT").unwrap_or_else(|_| "./data".to_string()),
    ));

    let ports = Ports {
        extraction: extraction_client(),
        objects,
        queues,
        scheduler,
        registry,
        results,
        profiles: profile_store(),
        pause: Arc::new(ThreadPause),
    };

    Ok(AppServices::new(config, ports, StoreMode::Persistent))
}
