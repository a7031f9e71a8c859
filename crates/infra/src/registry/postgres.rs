//! Postgres-backed upload registry.
//!
//! Rows live in `document_uploads`, keyed by `document_upload_id`. Calls are
//! synchronous: each one blocks on the runtime handle captured at
//! construction, so they must run on a blocking thread (never inside an
//! async task).

use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::instrument;

use docflow_core::{DocumentUploadId, JobHandle, TenantId};
use docflow_jobs::FailureReason;

use super::{JobProgress, UploadEntry, UploadRegistry, UploadStatus};
use crate::error::InfraError;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS document_uploads (
    document_upload_id TEXT PRIMARY KEY,
    tenant_id          TEXT NOT NULL,
    document_type      TEXT NOT NULL,
    source_path        TEXT,
    status             TEXT NOT NULL DEFAULT 'Pending',
    exception_status   TEXT,
    job_handle         TEXT,
    job_progress       TEXT,
    updated_at         TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

#[derive(Debug, Clone)]
pub struct PostgresUploadRegistry {
    pool: PgPool,
    runtime: Handle,
}

impl PostgresUploadRegistry {
    pub fn new(pool: PgPool, runtime: Handle) -> Self {
        Self { pool, runtime }
    }

    pub fn ensure_schema(&self) -> Result<(), InfraError> {
        self.runtime.block_on(async {
            sqlx::query(SCHEMA)
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(registry_error)
        })
    }
}

fn registry_error(e: sqlx::Error) -> InfraError {
    InfraError::Registry(e.to_string())
}

fn row_to_entry(row: &PgRow) -> Result<UploadEntry, InfraError> {
    let text = |column: &str| row.try_get::<String, _>(column).map_err(registry_error);
    let optional = |column: &str| {
        row.try_get::<Option<String>, _>(column)
            .map_err(registry_error)
    };
    let corrupt = |what: &str, value: &str| InfraError::Registry(format!("corrupt {what}: {value:?}"));

    let id = text("document_upload_id")?;
    let tenant = text("tenant_id")?;
    let status = text("status")?;

    Ok(UploadEntry {
        document_upload_id: DocumentUploadId::parse(id.clone())
            .map_err(|_| corrupt("document_upload_id", &id))?,
        tenant_id: TenantId::parse(tenant.clone()).map_err(|_| corrupt("tenant_id", &tenant))?,
        document_type: text("document_type")?,
        source_path: optional("source_path")?,
        status: UploadStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        exception_status: optional("exception_status")?,
        job_handle: optional("job_handle")?
            .map(|h| JobHandle::parse(h.clone()).map_err(|_| corrupt("job_handle", &h)))
            .transpose()?,
        progress: optional("job_progress")?
            .map(|p| JobProgress::parse(&p).ok_or_else(|| corrupt("job_progress", &p)))
            .transpose()?,
    })
}

impl UploadRegistry for PostgresUploadRegistry {
    #[instrument(skip(self), fields(document_upload_id = %id))]
    fn get(&self, id: &DocumentUploadId) -> Result<Option<UploadEntry>, InfraError> {
        let row = self.runtime.block_on(async {
            sqlx::query(
                r#"
                SELECT document_upload_id, tenant_id, document_type, source_path,
                       status, exception_status, job_handle, job_progress
                FROM document_uploads
                WHERE document_upload_id = $1
                "#,
            )
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(registry_error)
        })?;

        row.as_ref().map(row_to_entry).transpose()
    }

    #[instrument(skip(self), fields(document_upload_id = %id, job_handle = %handle))]
    fn mark_in_progress(&self, id: &DocumentUploadId, handle: &JobHandle) -> Result<(), InfraError> {
        let result = self.runtime.block_on(
            sqlx::query(
                r#"
                UPDATE document_uploads
                SET status = $2, job_handle = $3, job_progress = $4, updated_at = now()
                WHERE document_upload_id = $1
                "#,
            )
            .bind(id.as_str())
            .bind(UploadStatus::InProgress.as_str())
            .bind(handle.as_str())
            .bind(JobProgress::Submitted.as_str())
            .execute(&self.pool),
        );
        expect_row(id, result)
    }

    #[instrument(skip(self), fields(document_upload_id = %id, progress = progress.as_str()))]
    fn mark_progress(&self, id: &DocumentUploadId, progress: JobProgress) -> Result<(), InfraError> {
        let result = self.runtime.block_on(
            sqlx::query(
                r#"
                UPDATE document_uploads
                SET job_progress = $2, updated_at = now()
                WHERE document_upload_id = $1
                "#,
            )
            .bind(id.as_str())
            .bind(progress.as_str())
            .execute(&self.pool),
        );
        expect_row(id, result)
    }

    #[instrument(skip(self), fields(document_upload_id = %id, reason = %reason))]
    fn mark_failed(&self, id: &DocumentUploadId, reason: FailureReason) -> Result<(), InfraError> {
        let result = self.runtime.block_on(
            sqlx::query(
                r#"
                UPDATE document_uploads
                SET status = $2, exception_status = $3, job_progress = NULL, updated_at = now()
                WHERE document_upload_id = $1
                "#,
            )
            .bind(id.as_str())
            .bind(UploadStatus::Fail.as_str())
            .bind(reason.as_str())
            .execute(&self.pool),
        );
        expect_row(id, result)
    }
}

fn expect_row(
    id: &DocumentUploadId,
    result: Result<PgQueryResult, sqlx::Error>,
) -> Result<(), InfraError> {
    if result.map_err(registry_error)?.rows_affected() == 0 {
        return Err(InfraError::Registry(format!("no registry entry for {id}")));
    }
    Ok(())
}
