//! Persistence seams for the orchestrator.
//!
//! Artifacts are keyed by (user, job). `upsert` overwrites the active version
//! (last write wins); `append_version` keeps history and repoints the active
//! version at the new row.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ArtifactVersion, OptimizedArtifact, Profile};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError>;
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Idempotent by (user, job): replaces the active version in place.
    async fn upsert(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        artifact: &OptimizedArtifact,
    ) -> Result<Uuid, AppError>;

    /// Stores `artifact` as version `max + 1` and makes it the active one.
    async fn append_version(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        artifact: &OptimizedArtifact,
    ) -> Result<Uuid, AppError>;

    async fn active(&self, user_id: Uuid, job_id: Uuid)
        -> Result<Option<ArtifactVersion>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory adapters (CLI without DATABASE_URL, tests)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: Mutex<HashMap<Uuid, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the user's profile wholesale.
    pub fn insert(&self, user_id: Uuid, profile: Profile) -> Result<(), AppError> {
        self.profiles
            .lock()
            .map_err(|_| AppError::Persistence("profile store lock poisoned".to_string()))?
            .insert(user_id, profile);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let profiles = self
            .profiles
            .lock()
            .map_err(|_| AppError::Persistence("profile store lock poisoned".to_string()))?;
        Ok(profiles.get(&user_id).cloned())
    }
}

#[derive(Debug, Default)]
struct JobArtifacts {
    versions: Vec<ArtifactVersion>,
    active: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: Mutex<HashMap<(Uuid, Uuid), JobArtifacts>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored versions for (user, job), oldest first.
    pub fn history(&self, user_id: Uuid, job_id: Uuid) -> Result<Vec<ArtifactVersion>, AppError> {
        let artifacts = self.lock()?;
        Ok(artifacts
            .get(&(user_id, job_id))
            .map(|a| a.versions.clone())
            .unwrap_or_default())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(Uuid, Uuid), JobArtifacts>>, AppError> {
        self.artifacts
            .lock()
            .map_err(|_| AppError::Persistence("artifact store lock poisoned".to_string()))
    }
}

fn to_version(id: Uuid, version: i32, artifact: &OptimizedArtifact) -> ArtifactVersion {
    ArtifactVersion {
        id,
        version,
        optimized_text: artifact.optimized_text.clone(),
        original_score: artifact.original_score,
        optimized_score: artifact.optimized_score,
        changes_made: artifact.changes_made.clone(),
        has_document: artifact.optimized_document.is_some(),
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        artifact: &OptimizedArtifact,
    ) -> Result<Uuid, AppError> {
        let mut artifacts = self.lock()?;
        let entry = artifacts.entry((user_id, job_id)).or_default();

        match entry.versions.get_mut(entry.active) {
            Some(current) => {
                let id = current.id;
                *current = to_version(id, current.version, artifact);
                Ok(id)
            }
            None => {
                let id = Uuid::new_v4();
                entry.versions.push(to_version(id, 1, artifact));
                entry.active = entry.versions.len() - 1;
                Ok(id)
            }
        }
    }

    async fn append_version(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        artifact: &OptimizedArtifact,
    ) -> Result<Uuid, AppError> {
        let mut artifacts = self.lock()?;
        let entry = artifacts.entry((user_id, job_id)).or_default();

        let next = entry.versions.iter().map(|v| v.version).max().unwrap_or(0) + 1;
        let id = Uuid::new_v4();
        entry.versions.push(to_version(id, next, artifact));
        entry.active = entry.versions.len() - 1;
        Ok(id)
    }

    async fn active(
        &self,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<ArtifactVersion>, AppError> {
        let artifacts = self.lock()?;
        Ok(artifacts
            .get(&(user_id, job_id))
            .and_then(|a| a.versions.get(a.active).cloned()))
    }
}
