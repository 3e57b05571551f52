use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("PostgreSQL connection failed")?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        user_id UUID PRIMARY KEY,
        raw_text TEXT NOT NULL DEFAULT '',
        skills TEXT[] NOT NULL DEFAULT '{}',
        experiences JSONB NOT NULL DEFAULT '[]',
        resume_s3_key TEXT,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS optimized_resumes (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        job_id UUID NOT NULL,
        version INTEGER NOT NULL,
        optimized_text TEXT NOT NULL,
        s3_pdf_key TEXT,
        original_score INTEGER NOT NULL,
        optimized_score INTEGER NOT NULL,
        changes_made TEXT[] NOT NULL DEFAULT '{}',
        details JSONB NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, job_id, version)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS active_optimized_resumes (
        user_id UUID NOT NULL,
        job_id UUID NOT NULL,
        resume_id UUID NOT NULL REFERENCES optimized_resumes (id),
        PRIMARY KEY (user_id, job_id)
    )
    "#,
];

/// Creates the optimizer tables if they are missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("schema setup failed")?;
    }
    info!("Database schema ready");
    Ok(())
}
