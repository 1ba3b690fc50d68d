use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use operator_repo_storage::{
    FindOptions, NewOperator, Operator, OperatorFilter, OperatorPatch, OperatorStorage,
    StorageError,
};
use tokio::sync::RwLock;
use tracing::trace;

use crate::query::{CompiledFilter, sort_operators};

/// In-memory operator storage backend.
///
/// This storage implementation provides:
/// - Full CRUD over a `BTreeMap` keyed by id (iteration follows id order)
/// - A single `RwLock`, so `find_one_and_update` and `delete_many` are atomic
/// - Ids shaped like document-store object ids (24 hex chars, insertion ordered)
#[derive(Debug)]
pub struct InMemoryStorage {
    pub(crate) data: Arc<RwLock<BTreeMap<String, Operator>>>,
    /// Per-process counter appended to the id timestamp
    pub(crate) id_counter: AtomicU64,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            id_counter: AtomicU64::new(1),
        }
    }

    /// Generates the next id: 4 bytes of unix seconds plus an 8 byte counter.
    pub(crate) fn next_id(&self) -> String {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();
        let seq = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("{secs:08x}{seq:016x}")
    }

    /// Number of stored operators.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl OperatorStorage for InMemoryStorage {
    async fn insert(&self, operator: NewOperator) -> Result<Operator, StorageError> {
        let stored = operator.with_id(self.next_id());
        let mut guard = self.data.write().await;
        if guard.contains_key(&stored.id) {
            return Err(StorageError::internal(format!(
                "duplicate id generated: {}",
                stored.id
            )));
        }
        guard.insert(stored.id.clone(), stored.clone());
        trace!(id = %stored.id, total = guard.len(), "stored operator in memory");
        Ok(stored)
    }

    async fn find_one(&self, filter: &OperatorFilter) -> Result<Option<Operator>, StorageError> {
        let compiled = CompiledFilter::compile(filter)?;
        let guard = self.data.read().await;
        Ok(guard.values().find(|op| compiled.matches(op)).cloned())
    }

    async fn find(
        &self,
        filter: &OperatorFilter,
        options: &FindOptions,
    ) -> Result<Vec<Operator>, StorageError> {
        let compiled = CompiledFilter::compile(filter)?;
        let matched: Vec<Operator> = {
            let guard = self.data.read().await;
            guard
                .values()
                .filter(|op| compiled.matches(op))
                .cloned()
                .collect()
        };

        let sorted = sort_operators(matched, &options.sort);
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let page = sorted.into_iter().skip(skip);
        Ok(match options.effective_limit() {
            Some(limit) => page
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => page.collect(),
        })
    }

    async fn count(&self, filter: &OperatorFilter) -> Result<u64, StorageError> {
        let compiled = CompiledFilter::compile(filter)?;
        let guard = self.data.read().await;
        Ok(guard.values().filter(|op| compiled.matches(op)).count() as u64)
    }

    async fn find_one_and_update(
        &self,
        filter: &OperatorFilter,
        patch: &OperatorPatch,
    ) -> Result<Option<Operator>, StorageError> {
        let compiled = CompiledFilter::compile(filter)?;
        let mut guard = self.data.write().await;
        let Some(existing) = guard.values_mut().find(|op| compiled.matches(op)) else {
            return Ok(None);
        };
        patch.apply_to(existing);
        Ok(Some(existing.clone()))
    }

    async fn delete_one(&self, filter: &OperatorFilter) -> Result<bool, StorageError> {
        let compiled = CompiledFilter::compile(filter)?;
        let mut guard = self.data.write().await;
        let key = guard
            .values()
            .find(|op| compiled.matches(op))
            .map(|op| op.id.clone());
        Ok(match key {
            Some(key) => guard.remove(&key).is_some(),
            None => false,
        })
    }

    async fn delete_many(&self, filter: &OperatorFilter) -> Result<u64, StorageError> {
        let compiled = CompiledFilter::compile(filter)?;
        let mut guard = self.data.write().await;
        let before = guard.len();
        guard.retain(|_, op| !compiled.matches(op));
        Ok((before - guard.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
