//! Messaging-window and staleness policy over assignment timestamps.

use crate::domain::entities::{AssignmentStatus, ChatAssignment};
use crate::domain::errors::{DomainError, DomainResult};
use chrono::{DateTime, Duration, Utc};

/// Free-form business messages are only allowed while this holds.
pub fn is_within_window(assignment: &ChatAssignment, now: DateTime<Utc>) -> bool {
    assignment.window_expires_at > now
}

/// Most recent sign that the owning attendant engaged with the chat.
pub fn attendant_reference_time(assignment: &ChatAssignment) -> Option<DateTime<Utc>> {
    match (assignment.last_attendant_message_at, assignment.assigned_at) {
        (Some(reply), Some(assigned)) => Some(reply.max(assigned)),
        (reply, assigned) => reply.or(assigned),
    }
}

/// Customer is waiting on an owner who has not engaged for `threshold`.
///
/// Independent of the window: a chat can be inside its window and stale.
pub fn is_stale(assignment: &ChatAssignment, now: DateTime<Utc>, threshold: Duration) -> bool {
    if !matches!(
        assignment.status,
        AssignmentStatus::Assigned | AssignmentStatus::Active
    ) || assignment.assigned_to.is_none()
    {
        return false;
    }

    let customer_waiting = match assignment.last_attendant_message_at {
        Some(reply) => assignment.last_customer_message_at > reply,
        None => true,
    };

    let silent_too_long = match attendant_reference_time(assignment) {
        Some(reference) => match now.checked_sub_signed(threshold) {
            Some(cutoff) => reference < cutoff,
            None => false,
        },
        None => true,
    };

    customer_waiting && silent_too_long
}

/// Staleness threshold; rejects negative or unrepresentable hour counts.
pub fn hours_threshold(hours: i64) -> DomainResult<Duration> {
    non_negative("stale_assignment_hours", hours, Duration::try_hours(hours))
}

/// Inactivity threshold; rejects negative or unrepresentable minute counts.
pub fn minutes_threshold(minutes: i64) -> DomainResult<Duration> {
    non_negative("inactivity_minutes", minutes, Duration::try_minutes(minutes))
}

/// The instant `threshold` before `now`.
pub fn cutoff_before(now: DateTime<Utc>, threshold: Duration) -> DomainResult<DateTime<Utc>> {
    now.checked_sub_signed(threshold)
        .ok_or_else(|| DomainError::InvalidValue {
            field: "threshold",
            value: threshold.to_string(),
        })
}

fn non_negative(
    field: &'static str,
    amount: i64,
    duration: Option<Duration>,
) -> DomainResult<Duration> {
    match duration {
        Some(duration) if amount >= 0 => Ok(duration),
        _ => Err(DomainError::InvalidValue {
            field,
            value: amount.to_string(),
        }),
    }
}
