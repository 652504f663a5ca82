use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{
    ArtifactRef, DubConfig, Job, JobFailure, JobId, JobState, Language, Stage, VoiceStyle,
};

/// Durable job repository. The compare-and-set transitions are
/// conditional UPDATEs checking the expected state in the WHERE clause,
/// so concurrent workers across processes serialize on the database row.
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguishes a lost compare-and-set from an unknown job after a
    /// conditional UPDATE touched zero rows.
    async fn classify_miss(&self, id: JobId, expected: &str) -> RepositoryError {
        let row = sqlx::query("SELECT state FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await;

        match row {
            Ok(Some(row)) => {
                let state: String = row.get("state");
                RepositoryError::Conflict(format!("job {} is {}, expected {}", id, state, expected))
            }
            Ok(None) => RepositoryError::NotFound(id.to_string()),
            Err(e) => RepositoryError::QueryFailed(e.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactRow {
    stage: String,
    artifact: String,
}

fn row_to_job(row: &PgRow) -> Result<Job, RepositoryError> {
    let state: String = row.get("state");
    let state = state
        .parse::<JobState>()
        .map_err(RepositoryError::QueryFailed)?;

    let source_language: String = row.get("source_language");
    let target_language: String = row.get("target_language");
    let voice_style: String = row.get("voice_style");
    let config = DubConfig {
        source_language: source_language
            .parse::<Language>()
            .map_err(RepositoryError::QueryFailed)?,
        target_language: target_language
            .parse::<Language>()
            .map_err(RepositoryError::QueryFailed)?,
        voice_style: voice_style
            .parse::<VoiceStyle>()
            .map_err(RepositoryError::QueryFailed)?,
        generate_captions: row.get("generate_captions"),
        source_filename: row.get("source_filename"),
        source_size_bytes: row.get::<i64, _>("source_size_bytes") as u64,
        source: ArtifactRef::from_raw(row.get::<String, _>("source_ref")),
    };

    let current_stage: Option<String> = row.get("current_stage");
    let current_stage = current_stage
        .map(|s| s.parse::<Stage>())
        .transpose()
        .map_err(RepositoryError::QueryFailed)?;

    let artifacts: Json<Vec<ArtifactRow>> = row.get("artifacts");
    let artifacts = artifacts
        .0
        .into_iter()
        .map(|a| {
            let stage = a.stage.parse::<Stage>().map_err(RepositoryError::QueryFailed)?;
            Ok((stage, ArtifactRef::from_raw(a.artifact)))
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    let error_stage: Option<String> = row.get("error_stage");
    let error = match error_stage {
        Some(stage) => Some(JobFailure {
            stage: stage.parse::<Stage>().map_err(RepositoryError::QueryFailed)?,
            kind: row.get::<Option<String>, _>("error_kind").unwrap_or_default(),
            message: row
                .get::<Option<String>, _>("error_message")
                .unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Job {
        id: JobId::from_uuid(row.get::<Uuid, _>("id")),
        state,
        config,
        current_stage,
        artifacts,
        error,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    })
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let artifacts: Vec<ArtifactRow> = job
            .artifacts
            .iter()
            .map(|(stage, artifact)| ArtifactRow {
                stage: stage.as_str().to_string(),
                artifact: artifact.as_str().to_string(),
            })
            .collect();

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, state, source_language, target_language, voice_style,
                generate_captions, source_filename, source_size_bytes,
                source_ref, current_stage, artifacts, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.state.as_str())
        .bind(job.config.source_language.as_code())
        .bind(job.config.target_language.as_code())
        .bind(job.config.voice_style.as_str())
        .bind(job.config.generate_captions)
        .bind(&job.config.source_filename)
        .bind(job.config.source_size_bytes as i64)
        .bind(job.config.source.as_str())
        .bind(job.current_stage.map(|s| s.as_str()))
        .bind(Json(artifacts))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.as_ref().map(row_to_job).transpose()
    }

    #[instrument(skip(self, failure), fields(job_id = %id, from = %from, to = %to))]
    async fn transition(
        &self,
        id: JobId,
        from: JobState,
        to: JobState,
        failure: Option<&JobFailure>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = $3, error_stage = $4, error_kind = $5,
                error_message = $6, updated_at = $7
            WHERE id = $1 AND state = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(failure.map(|f| f.stage.as_str()))
        .bind(failure.map(|f| f.kind.as_str()))
        .bind(failure.map(|f| f.message.as_str()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(self.classify_miss(id, from.as_str()).await);
        }

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn set_current_stage(
        &self,
        id: JobId,
        stage: Option<Stage>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE jobs SET current_stage = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(stage.map(|s| s.as_str()))
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self, artifact), fields(job_id = %id, stage = %stage))]
    async fn record_artifact(
        &self,
        id: JobId,
        stage: Stage,
        artifact: &ArtifactRef,
    ) -> Result<(), RepositoryError> {
        let guard = serde_json::json!([{ "stage": stage.as_str() }]);
        let entry = vec![ArtifactRow {
            stage: stage.as_str().to_string(),
            artifact: artifact.as_str().to_string(),
        }];

        // Write-once: the containment guard refuses a second artifact
        // for the same stage in the same statement that appends.
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET artifacts = artifacts || $3, updated_at = $4
            WHERE id = $1 AND NOT (artifacts @> $2)
            "#,
        )
        .bind(id.as_uuid())
        .bind(Json(guard))
        .bind(Json(entry))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM jobs WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
            return match exists {
                Some(_) => Err(RepositoryError::Conflict(format!(
                    "job {} already has an artifact for stage {}",
                    id, stage
                ))),
                None => Err(RepositoryError::NotFound(id.to_string())),
            };
        }

        Ok(())
    }

    #[instrument(skip(self), fields(state = %state))]
    async fn list_by_state(&self, state: JobState) -> Result<Vec<Job>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE state = $1 ORDER BY created_at DESC")
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.iter().map(row_to_job).collect()
    }
}
