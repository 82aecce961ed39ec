mod mcp;
mod web;

use std::sync::Arc;

use crate::app::MemoryService;
use crate::config::{Config, SearchConfig};
use crate::semantic::{Embedder, MemoryIndex, StatisticalEmbedder};
use crate::storage::BackendLocal;

/// Service with no persistence.
pub fn volatile_service() -> Arc<MemoryService> {
    let embedder = Arc::new(StatisticalEmbedder::default());
    let store = Arc::new(MemoryIndex::new(embedder.dimensions()));
    Arc::new(MemoryService::new(
        embedder,
        store,
        SearchConfig::default(),
        None,
    ))
}

/// Service persisting into `dir`.
pub fn persistent_service(dir: &std::path::Path) -> MemoryService {
    let storage = BackendLocal::new(dir).unwrap();
    MemoryService::open(&Config::default(), Box::new(storage)).unwrap()
}
