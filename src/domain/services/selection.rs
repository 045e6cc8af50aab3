use crate::domain::entities::{AttendantStatus, DistributionStrategy};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Pick the attendant that should receive the next chat.
///
/// Used both for first distribution and for stale reassignment. Candidates that
/// are not eligible (not available, or at capacity) or listed in `excluded` are
/// never returned. Ordering is total so the choice is deterministic.
pub fn select_attendant<'a>(
    candidates: &'a [AttendantStatus],
    strategy: DistributionStrategy,
    excluded: &HashSet<String>,
) -> Option<&'a AttendantStatus> {
    let eligible = candidates
        .iter()
        .filter(|a| a.is_eligible() && !excluded.contains(&a.user_id));

    match strategy {
        DistributionStrategy::LeastLoaded => eligible.min_by(|a, b| least_loaded_order(a, b)),
        DistributionStrategy::RoundRobin => eligible.min_by(|a, b| round_robin_order(a, b)),
    }
}

/// Lowest utilization, then fewest chats, then most recent activity, then user id.
fn least_loaded_order(a: &AttendantStatus, b: &AttendantStatus) -> Ordering {
    a.load_ratio()
        .total_cmp(&b.load_ratio())
        .then_with(|| a.active_chats.cmp(&b.active_chats))
        .then_with(|| b.last_activity_at.cmp(&a.last_activity_at))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Never-assigned first, then longest since last assignment, then user id.
fn round_robin_order(a: &AttendantStatus, b: &AttendantStatus) -> Ordering {
    match (a.last_assigned_at, b.last_assigned_at) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
    .then_with(|| a.user_id.cmp(&b.user_id))
}
