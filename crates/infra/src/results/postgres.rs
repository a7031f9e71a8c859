//! Postgres-backed result store.
//!
//! Placeholders go to `placeholder_records`, unique per
//! `(document_type, document_upload_id)`; timeline entries go to
//! `timeline_records`, unique per `timeline_for_id`. Both inserts use
//! `ON CONFLICT DO NOTHING`, so concurrent or repeated failure handling
//! converges on one row each.

use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::{debug, instrument};

use super::{PlaceholderFailureRecord, ResultStore, StoredPlaceholder, TimelineRecord};
use crate::error::InfraError;

pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS placeholder_records (
        document_type      TEXT NOT NULL,
        document_upload_id TEXT NOT NULL,
        record             JSONB NOT NULL,
        collection         TEXT NOT NULL,
        created_at         TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (document_type, document_upload_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS timeline_records (
        timeline_for_id UUID PRIMARY KEY,
        record          JSONB NOT NULL,
        created_at      TIMESTAMPTZ NOT NULL
    )
    "#,
];

#[derive(Debug, Clone)]
pub struct PostgresResultStore {
    pool: PgPool,
    runtime: Handle,
}

impl PostgresResultStore {
    pub fn new(pool: PgPool, runtime: Handle) -> Self {
        Self { pool, runtime }
    }

    pub fn ensure_schema(&self) -> Result<(), InfraError> {
        self.runtime.block_on(async {
            for statement in SCHEMA {
                sqlx::query(statement)
                    .execute(&self.pool)
                    .await
                    .map_err(store_error)?;
            }
            Ok::<_, InfraError>(())
        })
    }
}

fn store_error(e: sqlx::Error) -> InfraError {
    InfraError::ResultStore(e.to_string())
}

impl ResultStore for PostgresResultStore {
    #[instrument(
        skip(self, record),
        fields(
            document_upload_id = %record.document_upload_id,
            document_type = %record.document_type,
        )
    )]
    fn insert_placeholder_if_absent(
        &self,
        record: &PlaceholderFailureRecord,
    ) -> Result<StoredPlaceholder, InfraError> {
        let stored = serde_json::to_value(record)?;

        let existing = self.runtime.block_on(async {
            let inserted = sqlx::query(
                r#"
                INSERT INTO placeholder_records
                    (document_type, document_upload_id, record, collection, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (document_type, document_upload_id) DO NOTHING
                "#,
            )
            .bind(record.document_type.as_str())
            .bind(record.document_upload_id.as_str())
            .bind(&stored)
            .bind(&record.collection)
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

            if inserted.rows_affected() == 1 {
                return Ok::<_, InfraError>(None);
            }

            let row = sqlx::query(
                r#"
                SELECT record
                FROM placeholder_records
                WHERE document_type = $1 AND document_upload_id = $2
                "#,
            )
            .bind(record.document_type.as_str())
            .bind(record.document_upload_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

            row.try_get::<serde_json::Value, _>("record")
                .map(Some)
                .map_err(store_error)
        })?;

        match existing {
            None => Ok(StoredPlaceholder {
                record: record.clone(),
                inserted: true,
            }),
            Some(value) => {
                debug!("placeholder already recorded");
                Ok(StoredPlaceholder {
                    record: serde_json::from_value(value)?,
                    inserted: false,
                })
            }
        }
    }

    #[instrument(skip(self, record), fields(timeline_for_id = %record.timeline_for_id))]
    fn append_timeline(&self, record: &TimelineRecord) -> Result<(), InfraError> {
        let stored = serde_json::to_value(record)?;

        self.runtime.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO timeline_records (timeline_for_id, record, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (timeline_for_id) DO NOTHING
                "#,
            )
            .bind(record.timeline_for_id)
            .bind(&stored)
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(store_error)
        })
    }
}
