use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    app::errors::AppError,
    config::{Config, SearchConfig},
    documents::{Document, DocumentCreate, DocumentUpdate},
    semantic::{
        Embedder, EmbeddingVector, MemoryIndex, RankedResult, SimilarityRanker,
        StatisticalEmbedder, StoredRecord, VectorStore,
    },
    storage::StorageManager,
};

pub const DOCUMENTS_FILE: &str = "memories.json";

#[derive(Debug, Default)]
struct Counters {
    add: AtomicU64,
    get: AtomicU64,
    list: AtomicU64,
    update: AtomicU64,
    delete: AtomicU64,
    search: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_documents: usize,
    pub add_document_count: u64,
    pub get_document_count: u64,
    pub get_all_documents: u64,
    pub update_document_count: u64,
    pub delete_document_count: u64,
    pub search_count: u64,
}

/// Document CRUD and search over an embedder and a vector store.
///
/// The store is the source of truth while running. When a storage backend
/// is attached, every mutation rewrites `memories.json`; vectors are not
/// saved and get recomputed on [`MemoryService::open`].
pub struct MemoryService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    ranker: SimilarityRanker,
    search_config: SearchConfig,
    storage: Option<Box<dyn StorageManager>>,
    write_lock: Mutex<()>,
    counters: Counters,
}

impl MemoryService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        search_config: SearchConfig,
        storage: Option<Box<dyn StorageManager>>,
    ) -> Self {
        let ranker = SimilarityRanker::new(embedder.clone(), store.clone(), &search_config);

        Self {
            embedder,
            store,
            ranker,
            search_config,
            storage,
            write_lock: Mutex::new(()),
            counters: Counters::default(),
        }
    }

    /// Build a service from config, restoring documents saved in `storage`.
    pub fn open(config: &Config, storage: Box<dyn StorageManager>) -> Result<Self, AppError> {
        let documents = load_documents(storage.as_ref())?;

        let embedder = Arc::new(StatisticalEmbedder::new(config.embedding.clone()));
        log::info!(
            "Using {} embedder with {} dimensions",
            embedder.name(),
            embedder.dimensions()
        );
        let store = Arc::new(MemoryIndex::with_capacity(
            embedder.dimensions(),
            documents.len(),
        ));

        let service = Self::new(embedder, store, config.search.clone(), Some(storage));
        service.restore(documents)?;

        Ok(service)
    }

    fn restore(&self, documents: Vec<Document>) -> Result<(), AppError> {
        if documents.is_empty() {
            log::info!("No saved memories, starting fresh");
            return Ok(());
        }

        let embedder = &self.embedder;
        let records: Vec<StoredRecord> = documents
            .par_iter()
            .map(|doc| to_record(embedder.as_ref(), doc))
            .collect();

        let count = records.len();
        for record in records {
            self.store.insert(record)?;
        }

        log::info!("Loaded {count} memories");
        Ok(())
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search_config
    }

    pub fn embed(&self, text: &str) -> EmbeddingVector {
        self.embedder.embed(text)
    }

    pub fn add(&self, create: DocumentCreate) -> Result<Document, AppError> {
        let doc = Document::new(create);
        self.commit(|| Ok(((), Change::Put(doc.clone()))))?;
        Counters::bump(&self.counters.add);

        log::info!("Added memory id={} tags={:?}", doc.id, doc.tags);
        Ok(doc)
    }

    pub fn get(&self, id: &str) -> Result<Document, AppError> {
        let doc = self.find(id)?;
        Counters::bump(&self.counters.get);
        Ok(doc)
    }

    pub fn update(&self, id: &str, update: DocumentUpdate) -> Result<Document, AppError> {
        let doc = self.modify(id, |doc| doc.apply(update))?;
        Counters::bump(&self.counters.update);

        log::info!("Updated memory id={id}");
        Ok(doc)
    }

    /// Toggle the favorite flag. Unlike [`MemoryService::update`] this keeps `created_at`.
    pub fn set_favorite(&self, id: &str, favorite: bool) -> Result<Document, AppError> {
        let doc = self.modify(id, |doc| doc.favorite = favorite)?;
        Counters::bump(&self.counters.update);

        log::info!("Set favorite={favorite} on memory id={id}");
        Ok(doc)
    }

    pub fn delete(&self, id: &str) -> Result<(), AppError> {
        self.commit(|| {
            if self.store.get(id)?.is_none() {
                return Err(AppError::NotFound(id.to_string()));
            }
            Ok(((), Change::Remove(id.to_string())))
        })?;
        Counters::bump(&self.counters.delete);

        log::info!("Deleted memory id={id}");
        Ok(())
    }

    pub fn search(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<RankedResult>, AppError> {
        log::info!(
            "Searching memories query_len={} limit={limit} threshold={threshold}",
            query.chars().count()
        );

        let results = self.ranker.search(query, limit, threshold).map_err(|err| {
            log::error!("Search failed: {err}");
            err
        })?;
        Counters::bump(&self.counters.search);

        log::info!("Search completed with {} results", results.len());
        Ok(results)
    }

    /// Every document, oldest first.
    pub fn list(&self) -> Result<Vec<Document>, AppError> {
        let documents = self
            .ranker
            .list_all(self.search_config.list_limit)?
            .into_iter()
            .map(|result| result.document)
            .collect();
        Counters::bump(&self.counters.list);

        Ok(documents)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            total_documents: self.store.len(),
            add_document_count: self.counters.add.load(Ordering::Relaxed),
            get_document_count: self.counters.get.load(Ordering::Relaxed),
            get_all_documents: self.counters.list.load(Ordering::Relaxed),
            update_document_count: self.counters.update.load(Ordering::Relaxed),
            delete_document_count: self.counters.delete.load(Ordering::Relaxed),
            search_count: self.counters.search.load(Ordering::Relaxed),
        }
    }

    fn find(&self, id: &str) -> Result<Document, AppError> {
        self.store
            .get(id)?
            .map(|record| Document::from_stored(&record.id, &record.content, &record.metadata))
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Document)) -> Result<Document, AppError> {
        self.commit(|| {
            let mut doc = self.find(id)?;
            f(&mut doc);
            Ok((doc.clone(), Change::Put(doc)))
        })
    }

    /// Plan a change under the write lock, save it, then apply it to the store.
    ///
    /// The store is only touched once `memories.json` holds the new state, so a
    /// failed save leaves the running service unchanged.
    fn commit<T>(
        &self,
        plan: impl FnOnce() -> Result<(T, Change), AppError>,
    ) -> Result<T, AppError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|err| anyhow!("write lock poisoned: {err}"))?;

        let (value, change) = plan()?;

        if let Some(storage) = &self.storage {
            let mut documents = self.snapshot()?;
            change.apply_to(&mut documents);
            persist(storage.as_ref(), &documents).map_err(|err| {
                log::error!("Failed to save memories: {err}");
                err
            })?;
        }

        match change {
            Change::Put(doc) => self.store.insert(to_record(self.embedder.as_ref(), &doc))?,
            Change::Remove(id) => {
                self.store.remove(&id)?;
            }
        }

        Ok(value)
    }

    /// All documents in store order, read through a zero probe.
    fn snapshot(&self) -> Result<Vec<Document>, AppError> {
        let probe = vec![0.0f32; self.store.dimensions()];
        Ok(self
            .store
            .query(&probe, self.store.len())?
            .into_iter()
            .map(|hit| Document::from_stored(&hit.id, &hit.content, &hit.metadata))
            .collect())
    }
}

/// A pending mutation, applied to the saved documents before the store.
enum Change {
    Put(Document),
    Remove(String),
}

impl Change {
    /// Replace in place or append, matching [`MemoryIndex`] ordering.
    fn apply_to(&self, documents: &mut Vec<Document>) {
        match self {
            Change::Put(doc) => match documents.iter_mut().find(|d| d.id == doc.id) {
                Some(existing) => *existing = doc.clone(),
                None => documents.push(doc.clone()),
            },
            Change::Remove(id) => documents.retain(|d| d.id.as_str() != id.as_str()),
        }
    }
}

fn persist(storage: &dyn StorageManager, documents: &[Document]) -> Result<(), AppError> {
    let data = serde_json::to_vec_pretty(documents)?;
    storage.write(DOCUMENTS_FILE, &data)?;

    log::debug!("Saved {} memories", documents.len());
    Ok(())
}

fn to_record(embedder: &dyn Embedder, doc: &Document) -> StoredRecord {
    StoredRecord {
        id: doc.id.to_string(),
        content: doc.content.clone(),
        metadata: doc.to_metadata(),
        embedding: embedder.embed(&doc.content),
    }
}

fn load_documents(storage: &dyn StorageManager) -> Result<Vec<Document>, AppError> {
    if !storage.exists(DOCUMENTS_FILE) {
        return Ok(Vec::new());
    }

    let data = storage.read(DOCUMENTS_FILE)?;
    let documents: Vec<Document> = serde_json::from_slice(&data)?;
    Ok(documents)
}
