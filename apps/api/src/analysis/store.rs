//! Row store for analysis records.
//!
//! Sequence fields are stored as JSON text blobs. They are encoded on write
//! and decoded on read here, so nothing outside this module sees the storage
//! representation. Rows are append-only: there is no update or delete.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::models::analysis::{AnalysisRecord, AnalysisSummary, NewAnalysis};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    email TEXT,
    phone TEXT,
    links TEXT,
    summary TEXT,
    experience TEXT,
    education TEXT,
    projects TEXT,
    certifications TEXT,
    technical_skills TEXT,
    soft_skills TEXT,
    rating REAL,
    improvement_areas TEXT,
    suggested_skills TEXT,
    original_filename TEXT NOT NULL,
    raw_text TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)
"#;

const CREATE_CREATED_AT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_analyses_created_at ON analyses (created_at)";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("failed to encode column `{column}`: {source}")]
    Encode {
        column: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to decode column `{column}` of analysis {id}: {source}")]
    Decode {
        column: &'static str,
        id: i64,
        source: serde_json::Error,
    },
}

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: i64,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    links: Option<String>,
    summary: Option<String>,
    experience: Option<String>,
    education: Option<String>,
    projects: Option<String>,
    certifications: Option<String>,
    technical_skills: Option<String>,
    soft_skills: Option<String>,
    rating: Option<f64>,
    improvement_areas: Option<String>,
    suggested_skills: Option<String>,
    original_filename: String,
    raw_text: String,
    created_at: DateTime<Utc>,
}

/// Handle to the `analyses` table. Cheap to clone; every clone shares the
/// pool and the schema-initialised flag.
#[derive(Clone)]
pub struct AnalysisStore {
    pool: SqlitePool,
    schema: Arc<OnceCell<()>>,
}

impl AnalysisStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            schema: Arc::new(OnceCell::new()),
        }
    }

    /// Creates the table and index if absent. Idempotent.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        create_schema(&self.pool).await?;
        let _ = self.schema.set(());
        Ok(())
    }

    /// Runs `ensure_schema` once before the first operation on this handle.
    async fn ready(&self) -> Result<(), StoreError> {
        self.schema
            .get_or_try_init(|| create_schema(&self.pool))
            .await?;
        Ok(())
    }

    /// Appends a row and returns its store-assigned id.
    pub async fn insert(&self, analysis: &NewAnalysis) -> Result<i64, StoreError> {
        self.ready().await?;

        // Encode everything up front so a codec failure never reaches the table.
        let links = encode("links", &analysis.links)?;
        let experience = encode("experience", &analysis.experience)?;
        let education = encode("education", &analysis.education)?;
        let projects = encode("projects", &analysis.projects)?;
        let certifications = encode("certifications", &analysis.certifications)?;
        let technical_skills = encode("technical_skills", &analysis.technical_skills)?;
        let soft_skills = encode("soft_skills", &analysis.soft_skills)?;
        let suggested_skills = encode("suggested_skills", &analysis.suggested_skills)?;

        let result = sqlx::query(
            r#"
            INSERT INTO analyses (
                name, email, phone, links,
                summary, experience, education, projects, certifications,
                technical_skills, soft_skills,
                rating, improvement_areas, suggested_skills,
                original_filename, raw_text
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&analysis.name)
        .bind(&analysis.email)
        .bind(&analysis.phone)
        .bind(links)
        .bind(&analysis.summary)
        .bind(experience)
        .bind(education)
        .bind(projects)
        .bind(certifications)
        .bind(technical_skills)
        .bind(soft_skills)
        .bind(analysis.rating)
        .bind(&analysis.improvement_areas)
        .bind(suggested_skills)
        .bind(&analysis.original_filename)
        .bind(&analysis.raw_text)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Point lookup. `Ok(None)` means no row has this id.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<AnalysisRecord>, StoreError> {
        self.ready().await?;

        let row = sqlx::query_as::<_, AnalysisRow>("SELECT * FROM analyses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(decode_row).transpose()
    }

    /// All analyses, newest first.
    pub async fn list_summaries(&self) -> Result<Vec<AnalysisSummary>, StoreError> {
        self.ready().await?;

        let rows = sqlx::query_as::<_, AnalysisSummary>(
            "SELECT id, name, email, original_filename, created_at FROM analyses \
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

async fn create_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(CREATE_TABLE).execute(pool).await?;
    sqlx::query(CREATE_CREATED_AT_INDEX).execute(pool).await?;
    info!("Analysis schema ensured");
    Ok(())
}

fn encode<T: Serialize + ?Sized>(column: &'static str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode { column, source })
}

/// A NULL blob reads as the empty value.
fn decode<T: DeserializeOwned + Default>(
    id: i64,
    column: &'static str,
    raw: Option<String>,
) -> Result<T, StoreError> {
    match raw {
        None => Ok(T::default()),
        Some(text) => {
            serde_json::from_str(&text).map_err(|source| StoreError::Decode { column, id, source })
        }
    }
}

fn decode_row(row: AnalysisRow) -> Result<AnalysisRecord, StoreError> {
    let id = row.id;
    Ok(AnalysisRecord {
        id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        links: decode(id, "links", row.links)?,
        summary: row.summary,
        experience: decode(id, "experience", row.experience)?,
        education: decode(id, "education", row.education)?,
        projects: decode(id, "projects", row.projects)?,
        certifications: decode(id, "certifications", row.certifications)?,
        technical_skills: decode(id, "technical_skills", row.technical_skills)?,
        soft_skills: decode(id, "soft_skills", row.soft_skills)?,
        rating: row.rating,
        improvement_areas: row.improvement_areas,
        suggested_skills: decode(id, "suggested_skills", row.suggested_skills)?,
        original_filename: row.original_filename,
        raw_text: row.raw_text,
        created_at: row.created_at,
    })
}

/// Single-connection in-memory store for tests.
#[cfg(test)]
pub(crate) async fn memory_store() -> AnalysisStore {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    AnalysisStore::new(pool)
}
