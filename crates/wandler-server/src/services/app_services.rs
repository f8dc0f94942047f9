// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — wires the converters, the security operator, the
// artifact registry and its sweeper together, and gives request handlers
// async-friendly entry points into them.
//
// Conversions and registry I/O are synchronous, so they run on Tokio's
// blocking pool. Conversions are additionally bounded by the configured
// timeout.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use wandler_artifact::{ArtifactRegistry, SweepReport, Sweeper, SweeperSnapshot};
use wandler_core::AppConfig;
use wandler_core::error::{Result, WandlerError};
use wandler_core::types::{Artifact, ArtifactId, ArtifactKind, ArtifactMetadata};
use wandler_document::{
    ConversionOutput, ConversionSettings, Converter, PageRasterizer, SecurityOperator,
    UnavailableRasterizer,
};

use super::fetch::RemoteFetcher;

/// Shared services handed to every request handler as axum state.
///
/// All fields are cheaply cloneable (Arc-wrapped) so the struct can be
/// cloned per request.
#[derive(Clone)]
pub struct AppServices {
    config: Arc<AppConfig>,
    converter: Converter,
    security: SecurityOperator,
    registry: Arc<ArtifactRegistry>,
    sweeper: Arc<Mutex<Sweeper>>,
    fetcher: RemoteFetcher,
}

impl AppServices {
    /// Initialise all services from configuration. Call once at startup.
    ///
    /// Opens the artifact store and binds the rasterisation backend. Without
    /// one the service still starts; PDF page rendering then fails with a
    /// render error and multi-page conversions show error placeholders.
    pub fn init(config: AppConfig) -> Result<Self> {
        let registry = Arc::new(ArtifactRegistry::from_config(&config)?);
        let rasterizer = select_rasterizer(&config);
        Self::with_parts(config, rasterizer, registry)
    }

    /// Assemble services around an explicit rasterizer and registry.
    pub fn with_parts(
        config: AppConfig,
        rasterizer: Arc<dyn PageRasterizer>,
        registry: Arc<ArtifactRegistry>,
    ) -> Result<Self> {
        let converter = Converter::new(rasterizer, ConversionSettings::from(&config));
        let security = SecurityOperator::new(config.unlock_passwords.clone());
        let fetcher = RemoteFetcher::new(config.fetch_timeout(), config.max_upload_bytes)?;
        let sweeper = Sweeper::new(Arc::clone(&registry), config.sweep_interval(), registry.ttl());

        info!(
            rasterizer = converter.rasterizer_name(),
            ttl_hours = registry.ttl().num_hours(),
            "app services initialised"
        );

        Ok(Self {
            config: Arc::new(config),
            converter,
            security,
            registry,
            sweeper: Arc::new(Mutex::new(sweeper)),
            fetcher,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn security(&self) -> &SecurityOperator {
        &self.security
    }

    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    pub fn fetcher(&self) -> &RemoteFetcher {
        &self.fetcher
    }

    // -- Blocking work -------------------------------------------------------

    /// Run a conversion on the blocking pool, bounded by the configured
    /// timeout. On timeout the worker runs to completion and its result is
    /// dropped.
    pub async fn run_blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let limit = self.config.conversion_timeout();
        match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(WandlerError::Internal(format!("conversion task: {join}"))),
            Err(_) => Err(WandlerError::Timeout(limit)),
        }
    }

    // -- Artifacts -----------------------------------------------------------

    pub async fn store(
        &self,
        bytes: Vec<u8>,
        filename: String,
        kind: ArtifactKind,
        metadata: ArtifactMetadata,
    ) -> Result<Artifact> {
        let registry = Arc::clone(&self.registry);
        blocking(move || registry.create(&bytes, &filename, kind, metadata)).await
    }

    pub async fn store_output(
        &self,
        output: ConversionOutput,
        metadata: ArtifactMetadata,
    ) -> Result<Artifact> {
        self.store(output.bytes, output.filename, output.kind, metadata)
            .await
    }

    /// Store several outputs of one request. If any store fails, the ones
    /// already registered are deleted again before the error is returned.
    pub async fn store_outputs(
        &self,
        outputs: Vec<(ConversionOutput, ArtifactMetadata)>,
    ) -> Result<Vec<Artifact>> {
        let mut stored: Vec<Artifact> = Vec::with_capacity(outputs.len());
        for (output, metadata) in outputs {
            match self.store_output(output, metadata).await {
                Ok(artifact) => stored.push(artifact),
                Err(err) => {
                    for artifact in &stored {
                        if let Err(cleanup) = self.delete_artifact(artifact.id).await {
                            warn!(artifact_id = %artifact.id, error = %cleanup, "rollback delete failed");
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(stored)
    }

    pub async fn read_artifact(&self, id: ArtifactId) -> Result<(Artifact, Vec<u8>)> {
        let registry = Arc::clone(&self.registry);
        blocking(move || registry.read(&id)).await
    }

    pub async fn delete_artifact(&self, id: ArtifactId) -> Result<Artifact> {
        let registry = Arc::clone(&self.registry);
        blocking(move || registry.delete(&id)).await
    }

    pub fn list_artifacts(&self) -> Vec<Artifact> {
        self.registry.list()
    }

    /// Where a client can fetch an artifact.
    pub fn download_url(&self, id: &ArtifactId) -> String {
        format!(
            "{}/artifacts/{id}",
            self.config.public_base_url.trim_end_matches('/')
        )
    }

    // -- Sweeper -------------------------------------------------------------

    pub async fn start_sweeper(&self) -> Result<SweeperSnapshot> {
        let mut sweeper = self.sweeper.lock().await;
        sweeper.start()?;
        Ok(sweeper.snapshot())
    }

    pub async fn stop_sweeper(&self) -> Result<SweeperSnapshot> {
        let mut sweeper = self.sweeper.lock().await;
        sweeper.stop().await?;
        Ok(sweeper.snapshot())
    }

    pub async fn sweep_now(&self) -> Result<SweepReport> {
        self.sweeper.lock().await.run_once().await
    }

    pub async fn sweeper_snapshot(&self) -> SweeperSnapshot {
        self.sweeper.lock().await.snapshot()
    }
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| WandlerError::Internal(format!("storage task: {e}")))?
}

#[cfg(feature = "pdfium")]
fn select_rasterizer(config: &AppConfig) -> Arc<dyn PageRasterizer> {
    match wandler_document::PdfiumRasterizer::new(config.pdfium_library_path.clone()) {
        Ok(pdfium) => Arc::new(pdfium),
        Err(err) => Arc::new(UnavailableRasterizer::new(err.to_string())),
    }
}

#[cfg(not(feature = "pdfium"))]
fn select_rasterizer(_config: &AppConfig) -> Arc<dyn PageRasterizer> {
    Arc::new(UnavailableRasterizer::new("built without the pdfium feature"))
}
