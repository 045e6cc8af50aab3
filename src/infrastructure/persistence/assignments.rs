use super::{optional_string, optional_time, parsed, required_time, Database};
use crate::domain::entities::{
    window_expiry_for, AssignmentHistory, AssignmentStatus, ChatAssignment,
};
use crate::domain::ports::assignment_repository::AssignmentRepository;
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::shared::utils::format_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, Row};

const ASSIGNMENT_COLUMNS: &str = "chat_id, company_id, assigned_to, status, assigned_at,
     last_customer_message_at, last_attendant_message_at, last_activity_at,
     window_expires_at, created_at, updated_at";

/// Rows waiting for an attendant.
const QUEUED_PREDICATE: &str =
    "(status = 'unassigned' OR (status = 'assigned' AND assigned_to IS NULL))";

fn assignment_from_row(row: &AnyRow) -> ApiResult<ChatAssignment> {
    Ok(ChatAssignment {
        chat_id: row.try_get("chat_id")?,
        company_id: row.try_get("company_id")?,
        assigned_to: optional_string(row, "assigned_to")?,
        status: parsed(row, "status")?,
        assigned_at: optional_time(row, "assigned_at")?,
        last_customer_message_at: required_time(row, "last_customer_message_at")?,
        last_attendant_message_at: optional_time(row, "last_attendant_message_at")?,
        last_activity_at: required_time(row, "last_activity_at")?,
        window_expires_at: required_time(row, "window_expires_at")?,
        created_at: required_time(row, "created_at")?,
        updated_at: required_time(row, "updated_at")?,
    })
}

fn history_from_row(row: &AnyRow) -> ApiResult<AssignmentHistory> {
    Ok(AssignmentHistory {
        id: row.try_get("id")?,
        chat_id: row.try_get("chat_id")?,
        company_id: row.try_get("company_id")?,
        from_attendant: optional_string(row, "from_attendant")?,
        to_attendant: optional_string(row, "to_attendant")?,
        reason: parsed(row, "reason")?,
        created_at: required_time(row, "created_at")?,
    })
}

#[async_trait]
impl AssignmentRepository for Database {
    async fn get_or_create(
        &self,
        chat_id: &str,
        company_id: &str,
        customer_message_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> ApiResult<(ChatAssignment, bool)> {
        let customer_at = format_timestamp(customer_message_at);
        let now = format_timestamp(at);

        // Keyed insert-if-absent: a redelivered webhook racing the first one
        // lands on the same row instead of creating a second.
        let result = sqlx::query(
            "INSERT INTO chat_assignments
                (chat_id, company_id, status, last_customer_message_at, last_activity_at,
                 window_expires_at, version, created_at, updated_at)
             VALUES (?, ?, 'unassigned', ?, ?, ?, 0, ?, ?)
             ON CONFLICT(chat_id) DO NOTHING",
        )
        .bind(chat_id)
        .bind(company_id)
        .bind(&customer_at)
        .bind(&customer_at)
        .bind(format_timestamp(window_expiry_for(customer_message_at)))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        let assignment = self.get_by_chat_id(chat_id).await?.ok_or_else(|| {
            ApiError::Internal(format!("Assignment {} vanished after upsert", chat_id))
        })?;

        Ok((assignment, created))
    }

    async fn get_by_chat_id(&self, chat_id: &str) -> ApiResult<Option<ChatAssignment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM chat_assignments WHERE chat_id = ?",
            ASSIGNMENT_COLUMNS
        ))
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(assignment_from_row).transpose()
    }

    async fn try_assign(
        &self,
        chat_id: &str,
        expected: Option<&str>,
        attendant_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<bool> {
        let now = format_timestamp(at);
        let result = sqlx::query(
            "UPDATE chat_assignments
             SET assigned_to = ?,
                 status = 'assigned',
                 assigned_at = ?,
                 updated_at = ?,
                 version = version + 1
             WHERE chat_id = ?
               AND assigned_to IS ?
               AND status IN ('unassigned', 'assigned', 'active')",
        )
        .bind(attendant_id)
        .bind(&now)
        .bind(&now)
        .bind(chat_id)
        .bind(expected.map(str::to_string))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_customer_activity(
        &self,
        chat_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<Option<ChatAssignment>> {
        let customer_at = format_timestamp(at);
        let window = format_timestamp(window_expiry_for(at));

        // All right-hand sides read the pre-update row. Expired chats with an
        // owner reopen as active; expired orphans and resolved chats requeue.
        let row = sqlx::query(&format!(
            "UPDATE chat_assignments
             SET last_customer_message_at = MAX(last_customer_message_at, ?),
                 window_expires_at = MAX(window_expires_at, ?),
                 last_activity_at = MAX(last_activity_at, ?),
                 status = CASE
                     WHEN status = 'expired' AND assigned_to IS NOT NULL THEN 'active'
                     WHEN status IN ('expired', 'resolved') THEN 'unassigned'
                     ELSE status
                 END,
                 assigned_to = CASE WHEN status = 'resolved' THEN NULL ELSE assigned_to END,
                 assigned_at = CASE WHEN status = 'resolved' THEN NULL ELSE assigned_at END,
                 updated_at = ?,
                 version = version + 1
             WHERE chat_id = ?
             RETURNING {}",
            ASSIGNMENT_COLUMNS
        ))
        .bind(&customer_at)
        .bind(&window)
        .bind(&customer_at)
        .bind(&customer_at)
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(assignment_from_row).transpose()
    }

    async fn record_attendant_activity(
        &self,
        chat_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<Option<ChatAssignment>> {
        let attendant_at = format_timestamp(at);
        let row = sqlx::query(&format!(
            "UPDATE chat_assignments
             SET last_attendant_message_at = MAX(COALESCE(last_attendant_message_at, ''), ?),
                 last_activity_at = MAX(last_activity_at, ?),
                 status = CASE
                     WHEN status = 'assigned' AND assigned_to IS NOT NULL THEN 'active'
                     ELSE status
                 END,
                 updated_at = ?,
                 version = version + 1
             WHERE chat_id = ?
             RETURNING {}",
            ASSIGNMENT_COLUMNS
        ))
        .bind(&attendant_at)
        .bind(&attendant_at)
        .bind(&attendant_at)
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(assignment_from_row).transpose()
    }

    async fn try_resolve(
        &self,
        chat_id: &str,
        expected_status: AssignmentStatus,
        expected_owner: Option<&str>,
        at: DateTime<Utc>,
    ) -> ApiResult<bool> {
        let result = sqlx::query(
            "UPDATE chat_assignments
             SET status = 'resolved', updated_at = ?, version = version + 1
             WHERE chat_id = ? AND status = ? AND assigned_to IS ?",
        )
        .bind(format_timestamp(at))
        .bind(chat_id)
        .bind(expected_status.as_str())
        .bind(expected_owner.map(str::to_string))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_attendant(
        &self,
        attendant_id: &str,
        company_id: &str,
    ) -> ApiResult<Vec<ChatAssignment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chat_assignments
             WHERE assigned_to = ? AND company_id = ?
             ORDER BY assigned_at, chat_id",
            ASSIGNMENT_COLUMNS
        ))
        .bind(attendant_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(assignment_from_row).collect()
    }

    async fn list_unassigned(&self, company_id: &str) -> ApiResult<Vec<ChatAssignment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chat_assignments
             WHERE company_id = ? AND {}
             ORDER BY last_customer_message_at, chat_id",
            ASSIGNMENT_COLUMNS, QUEUED_PREDICATE
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(assignment_from_row).collect()
    }

    async fn count_unassigned(&self, company_id: &str) -> ApiResult<i64> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count FROM chat_assignments WHERE company_id = ? AND {}",
            QUEUED_PREDICATE
        ))
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("count")?)
    }

    async fn count_by_status(
        &self,
        company_id: &str,
    ) -> ApiResult<Vec<(AssignmentStatus, i64)>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count
             FROM chat_assignments
             WHERE company_id = ?
             GROUP BY status",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> ApiResult<(AssignmentStatus, i64)> {
                Ok((parsed(row, "status")?, row.try_get("count")?))
            })
            .collect()
    }

    async fn mark_expired(&self, company_id: &str, now: DateTime<Utc>) -> ApiResult<Vec<String>> {
        let now = format_timestamp(now);
        let rows = sqlx::query(
            "UPDATE chat_assignments
             SET status = 'expired', updated_at = ?, version = version + 1
             WHERE company_id = ?
               AND window_expires_at < ?
               AND status NOT IN ('resolved', 'expired')
             RETURNING chat_id",
        )
        .bind(&now)
        .bind(company_id)
        .bind(&now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> ApiResult<String> { Ok(row.try_get("chat_id")?) })
            .collect()
    }

    async fn list_stale(
        &self,
        company_id: &str,
        cutoff: DateTime<Utc>,
    ) -> ApiResult<Vec<ChatAssignment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chat_assignments
             WHERE company_id = ?
               AND status IN ('assigned', 'active')
               AND assigned_to IS NOT NULL
               AND MAX(COALESCE(last_attendant_message_at, ''), COALESCE(assigned_at, '')) < ?
               AND (last_attendant_message_at IS NULL
                    OR last_customer_message_at > last_attendant_message_at)
             ORDER BY last_customer_message_at, chat_id",
            ASSIGNMENT_COLUMNS
        ))
        .bind(company_id)
        .bind(format_timestamp(cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(assignment_from_row).collect()
    }

    async fn record_history(&self, history: &AssignmentHistory) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO assignment_history
                (id, chat_id, company_id, from_attendant, to_attendant, reason, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&history.id)
        .bind(&history.chat_id)
        .bind(&history.company_id)
        .bind(history.from_attendant.clone())
        .bind(history.to_attendant.clone())
        .bind(history.reason.as_str())
        .bind(format_timestamp(history.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_history(&self, chat_id: &str) -> ApiResult<Vec<AssignmentHistory>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, company_id, from_attendant, to_attendant, reason, created_at
             FROM assignment_history
             WHERE chat_id = ?
             ORDER BY created_at, rowid",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(history_from_row).collect()
    }
}
