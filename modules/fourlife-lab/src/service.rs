use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use futures::FutureExt;
use tracing::{info, warn};

use crate::cache::ArtifactCache;
use crate::descriptor::ArtifactDescriptor;
use crate::engine::SimulationEngine;
use crate::error::LabError;
use crate::flight::{Flight, FlightGroup};
use crate::panic_message;

pub type SharedLabError = Arc<LabError>;

/// Read-through cache over a simulation engine, with one run per cache file
/// in flight at a time.
pub struct LabService {
    cache: ArtifactCache,
    engine: Arc<dyn SimulationEngine>,
    flights: FlightGroup<String, Bytes, SharedLabError>,
}

impl LabService {
    pub fn new(cache: ArtifactCache, engine: Arc<dyn SimulationEngine>) -> Self {
        Self {
            cache,
            engine,
            flights: FlightGroup::new(),
        }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub async fn read(&self, descriptor: &ArtifactDescriptor) -> Option<Bytes> {
        self.cache.read(&descriptor.file_name).await
    }

    /// Regenerate and persist. Returns exactly the bytes written to the cache.
    ///
    /// The flight group drives the run on its own task, so a dropped request
    /// still finishes and populates the cache. An engine panic becomes
    /// `RunAborted` for every waiter.
    pub async fn run(
        &self,
        descriptor: &ArtifactDescriptor,
        timeout: Duration,
    ) -> Flight<Result<Bytes, SharedLabError>> {
        let engine = Arc::clone(&self.engine);
        let cache = self.cache.clone();
        let owned = descriptor.clone();

        let flight = self
            .flights
            .run(descriptor.file_name.clone(), move || async move {
                let attempt = async {
                    let bytes = engine.run(&owned, timeout).await?;
                    cache.write(&owned.file_name, bytes.clone()).await?;
                    Ok::<_, LabError>(bytes)
                };
                match AssertUnwindSafe(attempt).catch_unwind().await {
                    Ok(result) => result.map_err(Arc::new),
                    Err(panic) => Err(Arc::new(LabError::RunAborted(format!(
                        "engine panicked: {}",
                        panic_message(&*panic)
                    )))),
                }
            })
            .await;

        match &flight.result {
            Ok(bytes) => info!(
                kind = %descriptor.kind,
                file = descriptor.file_name.as_str(),
                bytes = bytes.len(),
                joined = flight.joined,
                "Lab run complete"
            ),
            Err(e) => warn!(
                kind = %descriptor.kind,
                file = descriptor.file_name.as_str(),
                joined = flight.joined,
                error = %e,
                "Lab run failed"
            ),
        }

        flight
    }
}
