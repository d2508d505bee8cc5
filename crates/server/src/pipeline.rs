//! Wiring for the chapter-case pipeline. `Pipeline::assemble` takes any
//! store, blob store and renderer; `connect` builds the production set
//! (Postgres, S3, Typst) from `config.toml` and the environment.

use std::sync::Arc;

use shared_types::{AppError, IssuanceSettings};

use crate::config::{feature_flags, issuance_settings, load_app_config};
use crate::db::get_db;
use crate::issuance::IssuanceEngine;
use crate::lifecycle::LifecycleController;
use crate::render::{DocumentRenderer, TypstRenderer};
use crate::resolver::PageResolver;
use crate::roznama::RoznamaLog;
use crate::storage::{BlobStore, S3BlobStore};
use crate::store::{EntityStore, PgEntityStore};
use crate::telemetry::{init_logging, init_telemetry};

pub struct Pipeline<S, B, R> {
    pub store: Arc<S>,
    pub blobs: Arc<B>,
    pub renderer: Arc<R>,
    pub resolver: PageResolver<S, B>,
    pub lifecycle: LifecycleController<S>,
    pub issuance: IssuanceEngine<S, B, R>,
    pub roznama: RoznamaLog<S, B, R>,
}

/// The production pipeline.
pub type PgPipeline = Pipeline<PgEntityStore, S3BlobStore, TypstRenderer<S3BlobStore>>;

impl<S: EntityStore, B: BlobStore, R: DocumentRenderer> Pipeline<S, B, R> {
    /// Build every component over one shared set of collaborators.
    pub fn assemble(
        store: Arc<S>,
        blobs: Arc<B>,
        renderer: Arc<R>,
        settings: IssuanceSettings,
    ) -> Self {
        let resolver = PageResolver::new(Arc::clone(&store), Arc::clone(&blobs), settings);
        let lifecycle = LifecycleController::new(Arc::clone(&store));
        let issuance = IssuanceEngine::new(
            Arc::clone(&store),
            Arc::clone(&blobs),
            Arc::clone(&renderer),
            resolver.clone(),
        );
        let roznama = RoznamaLog::new(Arc::clone(&store), lifecycle.clone(), issuance.clone());

        Self {
            store,
            blobs,
            renderer,
            resolver,
            lifecycle,
            issuance,
            roznama,
        }
    }
}

/// Load config, install logging, open the pool and connect to S3.
///
/// Call once from a tokio runtime. OTLP export is only attempted when the
/// `telemetry` flag is on.
pub async fn connect() -> Result<PgPipeline, AppError> {
    // A second call finds the subscriber already installed.
    if let Err(e) = init_logging("info") {
        tracing::debug!("{e}");
    }

    load_app_config();
    let flags = feature_flags();
    if flags.telemetry {
        init_telemetry()?;
    }

    let pool = get_db().await?;
    let store = Arc::new(PgEntityStore::new(pool.clone()));

    let blobs = Arc::new(S3BlobStore::from_env()?);
    if flags.s3 {
        blobs.ensure_bucket().await;
    }

    let settings = issuance_settings();
    let renderer = Arc::new(TypstRenderer::new(
        Arc::clone(&blobs),
        settings.max_concurrent_renders,
    ));

    tracing::info!(
        max_concurrent_renders = settings.max_concurrent_renders,
        case_file_prefix = %settings.case_file_prefix,
        "Chapter-case pipeline ready"
    );
    Ok(Pipeline::assemble(store, blobs, renderer, settings))
}
