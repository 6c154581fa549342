//! Job persistence.
//!
//! Persistence is best-effort: the pipeline logs a [`StoreError`] and keeps
//! the job's in-memory status.

use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::{Job, StoreError, StoreResult};

pub trait JobStore: Send + Sync {
    /// Insert or overwrite the record for `job.id`.
    fn save(&self, job: &Job) -> StoreResult<()>;

    fn load(&self, id: Uuid) -> StoreResult<Option<Job>>;
}

impl<T: JobStore + ?Sized> JobStore for Box<T> {
    fn save(&self, job: &Job) -> StoreResult<()> {
        (**self).save(job)
    }

    fn load(&self, id: Uuid) -> StoreResult<Option<Job>> {
        (**self).load(id)
    }
}

impl<T: JobStore + ?Sized> JobStore for Arc<T> {
    fn save(&self, job: &Job) -> StoreResult<()> {
        (**self).save(job)
    }

    fn load(&self, id: Uuid) -> StoreResult<Option<Job>> {
        (**self).load(id)
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<FxHashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobStore for MemoryJobStore {
    fn save(&self, job: &Job) -> StoreResult<()> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| StoreError::Corrupt("job map lock poisoned".into()))?;
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn load(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| StoreError::Corrupt("job map lock poisoned".into()))?;
        Ok(jobs.get(&id).cloned())
    }
}
