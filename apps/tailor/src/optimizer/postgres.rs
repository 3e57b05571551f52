//! Postgres + S3 adapters for the profile and artifact stores.
//!
//! Artifact rows live in `optimized_resumes`; the active version per
//! (user, job) is tracked in `active_optimized_resumes`. Mutated PDFs are
//! uploaded to S3 and only the key is stored in Postgres.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::artifact::{OptimizedResumeRow, ProfileRow};
use crate::models::{ArtifactVersion, ExperienceEntry, OptimizedArtifact, Profile};
use crate::optimizer::store::{ArtifactStore, ProfileStore};

/// Bucket-scoped S3 handle.
#[derive(Clone)]
pub struct DocumentBucket {
    pub client: aws_sdk_s3::Client,
    pub bucket: String,
}

impl DocumentBucket {
    async fn put_pdf(&self, key: &str, document: &Bytes) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(document.clone()))
            .content_type("application/pdf")
            .send()
            .await
            .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

        info!("Uploaded optimized PDF to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, AppError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("download of {key} failed: {e}")))?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::S3(format!("reading {key} failed: {e}")))?;
        Ok(body.into_bytes())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Profiles
// ────────────────────────────────────────────────────────────────────────────

pub struct PgProfileStore {
    pool: PgPool,
    bucket: Option<DocumentBucket>,
}

impl PgProfileStore {
    pub fn new(pool: PgPool, bucket: Option<DocumentBucket>) -> Self {
        Self { pool, bucket }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn load_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT user_id, raw_text, skills, experiences, resume_s3_key FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let experiences: Vec<ExperienceEntry> = serde_json::from_value(row.experiences)
            .map_err(|e| AppError::Persistence(format!("malformed experiences for {user_id}: {e}")))?;

        let document = match (&row.resume_s3_key, &self.bucket) {
            (Some(key), Some(bucket)) => Some(bucket.get(key).await?),
            (Some(key), None) => {
                warn!(%user_id, key, "profile has a stored résumé but no S3 bucket is configured");
                None
            }
            _ => None,
        };

        Ok(Some(Profile::new(
            row.raw_text,
            row.skills,
            experiences,
            document,
        )))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Artifacts
// ────────────────────────────────────────────────────────────────────────────

pub struct PgArtifactStore {
    pool: PgPool,
    bucket: Option<DocumentBucket>,
}

impl PgArtifactStore {
    pub fn new(pool: PgPool, bucket: Option<DocumentBucket>) -> Self {
        Self { pool, bucket }
    }

    /// Uploads the mutated PDF (if any) and returns its key.
    async fn store_document(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        row_id: Uuid,
        artifact: &OptimizedArtifact,
    ) -> Result<Option<String>, AppError> {
        let (Some(document), Some(bucket)) = (&artifact.optimized_document, &self.bucket) else {
            return Ok(None);
        };
        let key = format!("optimized/{user_id}/{job_id}/{row_id}.pdf");
        bucket.put_pdf(&key, document).await?;
        Ok(Some(key))
    }

    async fn active_id(&self, user_id: Uuid, job_id: Uuid) -> Result<Option<Uuid>, AppError> {
        Ok(sqlx::query_scalar(
            "SELECT resume_id FROM active_optimized_resumes WHERE user_id = $1 AND job_id = $2",
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_version(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        artifact: &OptimizedArtifact,
    ) -> Result<Uuid, AppError> {
        let details = details(artifact)?;
        let id = Uuid::new_v4();
        let s3_key = self.store_document(user_id, job_id, id, artifact).await?;

        let mut tx = self.pool.begin().await?;

        let current_max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(version) FROM optimized_resumes WHERE user_id = $1 AND job_id = $2",
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_one(&mut *tx)
        .await?;
        let new_version = current_max.unwrap_or(0) + 1;

        sqlx::query(
            r#"
            INSERT INTO optimized_resumes
                (id, user_id, job_id, version, optimized_text, s3_pdf_key,
                 original_score, optimized_score, changes_made, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(job_id)
        .bind(new_version)
        .bind(&artifact.optimized_text)
        .bind(&s3_key)
        .bind(artifact.original_score as i32)
        .bind(artifact.optimized_score as i32)
        .bind(&artifact.changes_made)
        .bind(&details)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO active_optimized_resumes (user_id, job_id, resume_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, job_id) DO UPDATE SET resume_id = EXCLUDED.resume_id
            "#,
        )
        .bind(user_id)
        .bind(job_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Stored optimized résumé {id} version {new_version} for user {user_id}, job {job_id}");
        Ok(id)
    }
}

fn details(artifact: &OptimizedArtifact) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(artifact)
        .map_err(|e| AppError::Persistence(format!("artifact serialization failed: {e}")))
}

#[async_trait]
impl ArtifactStore for PgArtifactStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        artifact: &OptimizedArtifact,
    ) -> Result<Uuid, AppError> {
        let Some(id) = self.active_id(user_id, job_id).await? else {
            return self.insert_version(user_id, job_id, artifact).await;
        };

        let details = details(artifact)?;
        let s3_key = self.store_document(user_id, job_id, id, artifact).await?;

        sqlx::query(
            r#"
            UPDATE optimized_resumes
            SET optimized_text = $2, s3_pdf_key = $3, original_score = $4,
                optimized_score = $5, changes_made = $6, details = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&artifact.optimized_text)
        .bind(&s3_key)
        .bind(artifact.original_score as i32)
        .bind(artifact.optimized_score as i32)
        .bind(&artifact.changes_made)
        .bind(&details)
        .execute(&self.pool)
        .await?;

        info!("Updated optimized résumé {id} for user {user_id}, job {job_id}");
        Ok(id)
    }

    async fn append_version(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        artifact: &OptimizedArtifact,
    ) -> Result<Uuid, AppError> {
        self.insert_version(user_id, job_id, artifact).await
    }

    async fn active(
        &self,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<ArtifactVersion>, AppError> {
        let row = sqlx::query_as::<_, OptimizedResumeRow>(
            r#"
            SELECT r.*
            FROM optimized_resumes r
            JOIN active_optimized_resumes a ON a.resume_id = r.id
            WHERE a.user_id = $1 AND a.job_id = $2
            "#,
        )
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ArtifactVersion::from))
    }
}
