use super::{optional_string, optional_time, parsed, required_time, Database};
use crate::domain::entities::{AttendantActivityLog, AttendantState, AttendantStatus};
use crate::domain::ports::attendant_repository::AttendantRepository;
use crate::infrastructure::http::middleware::error::ApiResult;
use crate::shared::utils::format_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, Row};

const ATTENDANT_COLUMNS: &str = "user_id, company_id, status, active_chats, max_chats,
     last_activity_at, last_assigned_at, created_at, updated_at";

fn attendant_from_row(row: &AnyRow) -> ApiResult<AttendantStatus> {
    Ok(AttendantStatus {
        user_id: row.try_get("user_id")?,
        company_id: row.try_get("company_id")?,
        status: parsed(row, "status")?,
        active_chats: row.try_get("active_chats")?,
        max_chats: row.try_get("max_chats")?,
        last_activity_at: required_time(row, "last_activity_at")?,
        last_assigned_at: optional_time(row, "last_assigned_at")?,
        created_at: required_time(row, "created_at")?,
        updated_at: required_time(row, "updated_at")?,
    })
}

fn activity_log_from_row(row: &AnyRow) -> ApiResult<AttendantActivityLog> {
    let old_status = optional_string(row, "old_status")?;
    Ok(AttendantActivityLog {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        company_id: row.try_get("company_id")?,
        old_status: old_status.and_then(|s| s.parse().ok()),
        new_status: parsed(row, "new_status")?,
        reason: row.try_get("reason")?,
        created_at: required_time(row, "created_at")?,
    })
}

#[async_trait]
impl AttendantRepository for Database {
    async fn get_attendant(
        &self,
        user_id: &str,
        company_id: &str,
    ) -> ApiResult<Option<AttendantStatus>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM attendant_status WHERE user_id = ? AND company_id = ?",
            ATTENDANT_COLUMNS
        ))
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(attendant_from_row).transpose()
    }

    async fn upsert_status(
        &self,
        user_id: &str,
        company_id: &str,
        status: AttendantState,
        default_max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        let now = format_timestamp(at);
        sqlx::query(
            "INSERT INTO attendant_status
                (user_id, company_id, status, active_chats, max_chats, last_activity_at, created_at, updated_at)
             VALUES (?, ?, ?, 0, ?, ?, ?, ?)
             ON CONFLICT(user_id, company_id) DO UPDATE SET
                status = excluded.status,
                last_activity_at = MAX(attendant_status.last_activity_at, excluded.last_activity_at),
                updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(company_id)
        .bind(status.as_str())
        .bind(default_max_chats)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_max_chats(
        &self,
        user_id: &str,
        company_id: &str,
        max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        let now = format_timestamp(at);
        sqlx::query(
            "INSERT INTO attendant_status
                (user_id, company_id, status, active_chats, max_chats, last_activity_at, created_at, updated_at)
             VALUES (?, ?, 'offline', 0, ?, ?, ?, ?)
             ON CONFLICT(user_id, company_id) DO UPDATE SET
                max_chats = excluded.max_chats,
                last_activity_at = MAX(attendant_status.last_activity_at, excluded.last_activity_at),
                updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(company_id)
        .bind(max_chats)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch_activity(
        &self,
        user_id: &str,
        company_id: &str,
        default_max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        let now = format_timestamp(at);
        sqlx::query(
            "INSERT INTO attendant_status
                (user_id, company_id, status, active_chats, max_chats, last_activity_at, created_at, updated_at)
             VALUES (?, ?, 'available', 0, ?, ?, ?, ?)
             ON CONFLICT(user_id, company_id) DO UPDATE SET
                last_activity_at = MAX(attendant_status.last_activity_at, excluded.last_activity_at)",
        )
        .bind(user_id)
        .bind(company_id)
        .bind(default_max_chats)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn adjust_load(
        &self,
        user_id: &str,
        company_id: &str,
        delta: i64,
        default_max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        let now = format_timestamp(at);
        // Single statement: the increment happens inside the store, so concurrent
        // adjustments from other processes compose instead of overwriting.
        sqlx::query(
            "INSERT INTO attendant_status
                (user_id, company_id, status, active_chats, max_chats, last_activity_at, created_at, updated_at)
             VALUES (?, ?, 'offline', MAX(?, 0), ?, ?, ?, ?)
             ON CONFLICT(user_id, company_id) DO UPDATE SET
                active_chats = MAX(attendant_status.active_chats + ?, 0),
                updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(company_id)
        .bind(delta)
        .bind(default_max_chats)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn try_reserve_capacity(
        &self,
        user_id: &str,
        company_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<bool> {
        let now = format_timestamp(at);
        let result = sqlx::query(
            "UPDATE attendant_status
             SET active_chats = active_chats + 1,
                 last_assigned_at = ?,
                 updated_at = ?
             WHERE user_id = ? AND company_id = ?
               AND status = 'available'
               AND active_chats < max_chats",
        )
        .bind(&now)
        .bind(&now)
        .bind(user_id)
        .bind(company_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_company(&self, company_id: &str) -> ApiResult<Vec<AttendantStatus>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM attendant_status WHERE company_id = ? ORDER BY user_id",
            ATTENDANT_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(attendant_from_row).collect()
    }

    async fn list_eligible(&self, company_id: &str) -> ApiResult<Vec<AttendantStatus>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM attendant_status
             WHERE company_id = ? AND status = 'available' AND active_chats < max_chats
             ORDER BY user_id",
            ATTENDANT_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(attendant_from_row).collect()
    }

    async fn count_by_status(&self, company_id: &str) -> ApiResult<Vec<(AttendantState, i64)>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count
             FROM attendant_status
             WHERE company_id = ?
             GROUP BY status",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> ApiResult<(AttendantState, i64)> {
                Ok((parsed(row, "status")?, row.try_get("count")?))
            })
            .collect()
    }

    async fn demote_inactive(
        &self,
        company_id: &str,
        cutoff: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> ApiResult<Vec<AttendantStatus>> {
        let cutoff = format_timestamp(cutoff);
        let now = format_timestamp(at);

        let rows = sqlx::query(&format!(
            "SELECT {} FROM attendant_status
             WHERE company_id = ? AND status != 'offline' AND last_activity_at < ?
             ORDER BY user_id",
            ATTENDANT_COLUMNS
        ))
        .bind(company_id)
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut demoted = Vec::new();
        for row in &rows {
            let candidate = attendant_from_row(row)?;
            // Re-check the predicate in the write: a heartbeat that landed after the
            // scan keeps the attendant online.
            let result = sqlx::query(
                "UPDATE attendant_status
                 SET status = 'offline', updated_at = ?
                 WHERE user_id = ? AND company_id = ?
                   AND status != 'offline' AND last_activity_at < ?",
            )
            .bind(&now)
            .bind(&candidate.user_id)
            .bind(company_id)
            .bind(&cutoff)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                demoted.push(candidate);
            }
        }

        Ok(demoted)
    }

    async fn create_activity_log(&self, log: &AttendantActivityLog) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO attendant_activity_logs
                (id, user_id, company_id, old_status, new_status, reason, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&log.id)
        .bind(&log.user_id)
        .bind(&log.company_id)
        .bind(log.old_status.map(|s| s.as_str().to_string()))
        .bind(log.new_status.as_str())
        .bind(&log.reason)
        .bind(format_timestamp(log.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_activity_logs(
        &self,
        user_id: &str,
        company_id: &str,
        limit: i64,
    ) -> ApiResult<Vec<AttendantActivityLog>> {
        let rows = sqlx::query(
            "SELECT id, user_id, company_id, old_status, new_status, reason, created_at
             FROM attendant_activity_logs
             WHERE user_id = ? AND company_id = ?
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(company_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(activity_log_from_row).collect()
    }
}
