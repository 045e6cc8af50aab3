mod helpers;

use chrono::Duration;
use helpers::*;
use std::collections::HashSet;
use wadesk::domain::entities::AssignmentReason;
use wadesk::infrastructure::http::middleware::error::ApiError;
use wadesk::domain::entities::{
    AssignmentStatus, AttendantState, DistributionOutcome, DistributionStrategy,
};

async fn queue_chat(h: &TestHarness, company_id: &str, chat_id: &str) {
    h.state
        .assignment_service
        .get_or_create(chat_id, company_id, h.now())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_no_eligible_attendant_leaves_chat_queued() {
    let h = setup().await;
    h.state
        .attendant_registry
        .set_status("agent-away", COMPANY, AttendantState::Away)
        .await
        .unwrap();
    queue_chat(&h, COMPANY, "chat-1").await;

    let outcome = h
        .state
        .distribution_engine
        .distribute_chat("chat-1", COMPANY)
        .await
        .unwrap();

    assert_eq!(outcome, DistributionOutcome::NoAttendantAvailable);
    assert!(h.chat("chat-1").await.is_queued());
}

#[tokio::test]
async fn test_least_loaded_picks_lowest_ratio() {
    let h = setup().await;
    h.available_attendant(COMPANY, "agent-a", 2).await;
    h.available_attendant(COMPANY, "agent-b", 5).await;
    let registry = &h.state.attendant_registry;
    registry.increment_load("agent-a", COMPANY, 1).await.unwrap();
    registry.increment_load("agent-b", COMPANY, 1).await.unwrap();
    queue_chat(&h, COMPANY, "chat-1").await;

    let outcome = h
        .state
        .distribution_engine
        .distribute_chat("chat-1", COMPANY)
        .await
        .unwrap();

    // 1/5 beats 1/2
    assert_eq!(
        outcome,
        DistributionOutcome::Assigned {
            attendant_id: "agent-b".to_string()
        }
    );
    assert_eq!(h.attendant(COMPANY, "agent-b").await.active_chats, 2);
    assert_eq!(h.attendant(COMPANY, "agent-a").await.active_chats, 1);
}

#[tokio::test]
async fn test_full_and_unavailable_attendants_are_skipped() {
    let h = setup().await;
    h.available_attendant(COMPANY, "agent-full", 1).await;
    h.state
        .attendant_registry
        .increment_load("agent-full", COMPANY, 1)
        .await
        .unwrap();
    h.state
        .attendant_registry
        .set_status("agent-busy", COMPANY, AttendantState::Busy)
        .await
        .unwrap();
    h.available_attendant(COMPANY, "agent-zero", 0).await;
    h.available_attendant(COMPANY, "agent-free", 2).await;
    queue_chat(&h, COMPANY, "chat-1").await;

    let outcome = h
        .state
        .distribution_engine
        .distribute_chat("chat-1", COMPANY)
        .await
        .unwrap();

    assert_eq!(outcome.attendant_id(), Some("agent-free"));
}

#[tokio::test]
async fn test_round_robin_rotates_through_attendants() {
    let h = setup().await;
    h.state
        .company_service
        .set_strategy(COMPANY, DistributionStrategy::RoundRobin)
        .await
        .unwrap();
    for agent in ["agent-a", "agent-b", "agent-c"] {
        h.available_attendant(COMPANY, agent, 10).await;
    }

    let mut picks = Vec::new();
    for i in 0..6 {
        let chat_id = format!("chat-{}", i);
        queue_chat(&h, COMPANY, &chat_id).await;
        let outcome = h
            .state
            .distribution_engine
            .distribute_chat(&chat_id, COMPANY)
            .await
            .unwrap();
        picks.push(outcome.attendant_id().unwrap().to_string());
        h.clock.advance(Duration::seconds(1));
    }

    assert_eq!(
        picks,
        vec!["agent-a", "agent-b", "agent-c", "agent-a", "agent-b", "agent-c"]
    );
}

#[tokio::test]
async fn test_owned_chat_reports_already_assigned() {
    let h = setup().await;
    h.available_attendant(COMPANY, "agent-1", 3).await;
    h.customer_writes(COMPANY, "chat-1").await;

    let outcome = h
        .state
        .distribution_engine
        .distribute_chat("chat-1", COMPANY)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DistributionOutcome::AlreadyAssigned {
            attendant_id: "agent-1".to_string()
        }
    );
    assert_eq!(h.attendant(COMPANY, "agent-1").await.active_chats, 1);
}

#[tokio::test]
async fn test_unknown_resolved_and_foreign_chats_are_not_distributable() {
    let h = setup().await;
    h.available_attendant(COMPANY, "agent-1", 3).await;
    let engine = &h.state.distribution_engine;

    assert_eq!(
        engine.distribute_chat("missing", COMPANY).await.unwrap(),
        DistributionOutcome::NotDistributable
    );

    queue_chat(&h, OTHER_COMPANY, "chat-foreign").await;
    assert_eq!(
        engine.distribute_chat("chat-foreign", COMPANY).await.unwrap(),
        DistributionOutcome::NotDistributable
    );

    h.customer_writes(COMPANY, "chat-done").await;
    h.state.assignment_service.resolve("chat-done").await.unwrap();
    assert_eq!(
        engine.distribute_chat("chat-done", COMPANY).await.unwrap(),
        DistributionOutcome::NotDistributable
    );
    assert_eq!(h.attendant(COMPANY, "agent-1").await.active_chats, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_simultaneous_chats_for_one_slot() {
    let h = setup().await;
    h.available_attendant(COMPANY, "agent-1", 1).await;
    queue_chat(&h, COMPANY, "chat-1").await;
    queue_chat(&h, COMPANY, "chat-2").await;

    let engine = &h.state.distribution_engine;
    let (first, second) = tokio::join!(
        engine.distribute_chat("chat-1", COMPANY),
        engine.distribute_chat("chat-2", COMPANY)
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    assert_eq!(outcomes.iter().filter(|o| o.is_assigned()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == DistributionOutcome::NoAttendantAvailable)
            .count(),
        1
    );
    assert_eq!(h.attendant(COMPANY, "agent-1").await.active_chats, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_bound_holds_under_a_burst() {
    let h = setup().await;
    h.available_attendant(COMPANY, "agent-a", 2).await;
    h.available_attendant(COMPANY, "agent-b", 3).await;

    let mut handles = Vec::new();
    for i in 0..12 {
        let chat_id = format!("chat-{}", i);
        queue_chat(&h, COMPANY, &chat_id).await;
        let engine = h.state.distribution_engine.clone();
        handles.push(tokio::spawn(async move {
            engine.distribute_chat(&chat_id, COMPANY).await
        }));
    }

    let mut assigned = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_assigned() {
            assigned += 1;
        }
    }

    let a = h.attendant(COMPANY, "agent-a").await;
    let b = h.attendant(COMPANY, "agent-b").await;
    assert!(a.active_chats <= a.max_chats);
    assert!(b.active_chats <= b.max_chats);
    assert_eq!(a.active_chats + b.active_chats, assigned);
    assert_eq!(assigned, 5);

    let owned_a = h
        .state
        .assignment_service
        .list_by_attendant("agent-a", COMPANY)
        .await
        .unwrap();
    assert_eq!(owned_a.len() as i64, a.active_chats);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_redelivered_webhook_assigns_one_attendant() {
    let h = setup().await;
    for agent in ["agent-a", "agent-b", "agent-c"] {
        h.available_attendant(COMPANY, agent, 3).await;
    }
    queue_chat(&h, COMPANY, "chat-1").await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let engine = h.state.distribution_engine.clone();
        handles.push(tokio::spawn(async move {
            engine.distribute_chat("chat-1", COMPANY).await
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(outcomes.iter().filter(|o| o.is_assigned()).count(), 1);
    let owners: HashSet<&str> = outcomes.iter().filter_map(|o| o.attendant_id()).collect();
    assert_eq!(owners.len(), 1);

    let chat = h.chat("chat-1").await;
    assert_eq!(chat.status, AssignmentStatus::Assigned);
    assert_eq!(chat.assigned_to.as_deref(), owners.into_iter().next());

    let mut total_load = 0;
    for agent in ["agent-a", "agent-b", "agent-c"] {
        total_load += h.attendant(COMPANY, agent).await.active_chats;
    }
    assert_eq!(total_load, 1);
}

#[tokio::test]
async fn test_distribute_queue_drains_oldest_first_until_capacity() {
    let h = setup().await;
    for i in 0..3 {
        queue_chat(&h, COMPANY, &format!("chat-{}", i)).await;
        h.clock.advance(Duration::minutes(1));
    }
    h.state
        .attendant_registry
        .set_max_chats("agent-1", COMPANY, 2)
        .await
        .unwrap();
    h.state
        .attendant_registry
        .set_status("agent-1", COMPANY, AttendantState::Available)
        .await
        .unwrap();

    let assigned = h
        .state
        .distribution_engine
        .distribute_queue(COMPANY)
        .await
        .unwrap();

    assert_eq!(assigned, 2);
    assert!(!h.chat("chat-0").await.is_queued());
    assert!(!h.chat("chat-1").await.is_queued());
    assert!(h.chat("chat-2").await.is_queued());
}

#[tokio::test]
async fn test_inbound_message_distributes_new_chat() {
    let h = setup().await;
    h.available_attendant(COMPANY, "agent-1", 3).await;

    let result = h
        .state
        .intake_service
        .handle_inbound_message("chat-1", COMPANY, None)
        .await
        .unwrap();

    assert_eq!(result.outcome.as_ref().and_then(|o| o.attendant_id()), Some("agent-1"));
    assert_eq!(result.assignment.assigned_to.as_deref(), Some("agent-1"));

    // Follow-up message from the same customer does not redistribute.
    let follow_up = h
        .state
        .intake_service
        .handle_inbound_message("chat-1", COMPANY, None)
        .await
        .unwrap();
    assert!(follow_up.outcome.is_none());
    assert_eq!(h.attendant(COMPANY, "agent-1").await.active_chats, 1);
}

#[tokio::test]
async fn test_store_failure_after_reservation_gives_the_slot_back() {
    let (h, store) = setup_faulty().await;
    h.available_attendant(COMPANY, "agent-1", 3).await;
    queue_chat(&h, COMPANY, "chat-1").await;

    store.fail_assign(true);
    let result = h
        .state
        .distribution_engine
        .distribute_chat("chat-1", COMPANY)
        .await;

    assert!(matches!(result, Err(ApiError::Internal(_))));
    assert_eq!(h.attendant(COMPANY, "agent-1").await.active_chats, 0);
    assert!(h.chat("chat-1").await.is_queued());

    store.fail_assign(false);
    let outcome = h
        .state
        .distribution_engine
        .distribute_chat("chat-1", COMPANY)
        .await
        .unwrap();
    assert_eq!(outcome.attendant_id(), Some("agent-1"));
    assert_eq!(h.attendant(COMPANY, "agent-1").await.active_chats, 1);
}

/// Two chats left unanswered on `agent-silent` for 26h while `agent-fresh` is free.
async fn two_stale_chats(h: &TestHarness) {
    let start = h.now();
    h.available_attendant(COMPANY, "agent-silent", 3).await;
    for chat_id in ["chat-1", "chat-2"] {
        h.customer_writes(COMPANY, chat_id).await;
        h.attendant_replies(chat_id).await;
    }
    h.available_attendant(COMPANY, "agent-fresh", 3).await;

    for chat_id in ["chat-1", "chat-2"] {
        h.state
            .intake_service
            .handle_inbound_message(chat_id, COMPANY, Some(start + Duration::hours(24)))
            .await
            .unwrap();
    }
    h.clock.set(start + Duration::hours(26));
}

#[tokio::test]
async fn test_failed_commit_during_reassignment_releases_new_owner_slot() {
    let (h, store) = setup_faulty().await;
    two_stale_chats(&h).await;

    store.fail_assign(true);
    let reassigned = h
        .state
        .assignment_service
        .reassign_stale(COMPANY, 24)
        .await
        .unwrap();

    assert_eq!(reassigned, 0);
    assert_eq!(h.attendant(COMPANY, "agent-fresh").await.active_chats, 0);
    assert_eq!(h.attendant(COMPANY, "agent-silent").await.active_chats, 2);
    for chat_id in ["chat-1", "chat-2"] {
        assert_eq!(
            h.chat(chat_id).await.assigned_to.as_deref(),
            Some("agent-silent")
        );
    }
}

#[tokio::test]
async fn test_reassignment_completes_when_old_owner_release_fails() {
    let (h, store) = setup_faulty().await;
    two_stale_chats(&h).await;

    store.fail_release(true);
    let reassigned = h
        .state
        .assignment_service
        .reassign_stale(COMPANY, 24)
        .await
        .unwrap();

    assert_eq!(reassigned, 2);
    assert_eq!(h.attendant(COMPANY, "agent-fresh").await.active_chats, 2);
    // the decrement never reached the store
    assert_eq!(h.attendant(COMPANY, "agent-silent").await.active_chats, 2);
    for chat_id in ["chat-1", "chat-2"] {
        assert_eq!(
            h.chat(chat_id).await.assigned_to.as_deref(),
            Some("agent-fresh")
        );
        let history = h.state.assignment_service.list_history(chat_id).await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.reason, AssignmentReason::ReassignedStale);
        assert_eq!(last.from_attendant.as_deref(), Some("agent-silent"));
    }
}
