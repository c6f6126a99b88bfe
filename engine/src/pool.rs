use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::{BridgeConfig, EngineBridge, EngineError, EngineReply, EngineRequest, SearchService};

/// A fixed set of long-lived bridges. Callers wait for a free bridge instead
/// of getting `Busy`.
pub struct EnginePool {
    bridges: Vec<Arc<EngineBridge>>,
    permits: Semaphore,
}

impl EnginePool {
    pub fn new(size: usize, config: BridgeConfig) -> Self {
        let size = size.max(1);
        let bridges = (0..size)
            .map(|id| Arc::new(EngineBridge::new(id, config.clone())))
            .collect();
        Self {
            bridges,
            permits: Semaphore::new(size),
        }
    }

    pub fn size(&self) -> usize {
        self.bridges.len()
    }

    pub async fn shutdown(&self) {
        for bridge in &self.bridges {
            bridge.shutdown().await;
        }
        tracing::info!("Engine pool shut down");
    }
}

#[async_trait::async_trait]
impl SearchService for EnginePool {
    async fn search(&self, request: EngineRequest) -> Result<EngineReply, EngineError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EngineError::Unavailable)?;

        // Holding a permit means at least one bridge is idle.
        for bridge in &self.bridges {
            match bridge.search(request.clone()).await {
                Err(EngineError::Busy) => continue,
                other => return other,
            }
        }
        Err(EngineError::Busy)
    }
}
