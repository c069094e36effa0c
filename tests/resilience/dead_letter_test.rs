use metasync::MetadataKind;

use crate::common::SyncTestCluster;

const ORG_UNIT: MetadataKind = MetadataKind::OrganisationUnit;

/// Case 1: a 422 from one replica dead-letters that event for that target
/// only; the partition moves on and other targets are untouched.
#[tokio::test]
async fn test_rejected_event_is_dead_lettered_and_queue_moves_on() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    cluster.replica_a.reject_ids.insert("fdc6uOvgoji".to_string());
    cluster
        .primary
        .create_org_unit("fdc6uOvgoji", "EVIL_CORP", "Evil Corp Hospital", "EvilCorp");
    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");

    assert!(
        cluster.wait_for_dead_letters(1).await,
        "rejected event should be dead-lettered"
    );

    // The rejecting replica still receives everything it accepts
    cluster
        .wait_for_entity(&cluster.replica_a_url, ORG_UNIT, "b7HFMWjj3im")
        .await
        .expect("accepted entity should pass the dead-lettered one");
    // The other target never saw a failure
    cluster
        .wait_for_entity(&cluster.replica_b_url, ORG_UNIT, "fdc6uOvgoji")
        .await
        .expect("other targets are unaffected by one replica's rejection");

    assert_eq!(
        cluster
            .entity_status(&cluster.replica_a_url, ORG_UNIT, "fdc6uOvgoji")
            .await,
        404
    );
    assert!(
        cluster.wait_for_empty_queue().await,
        "dead-lettering must unblock compaction"
    );
    assert_eq!(cluster.service.dead_letter_count(), 1);

    cluster.shutdown().await;
}

/// Case 2: a version conflict (409) is permanent; no retry can fix it, so
/// it dead-letters on the first attempt.
#[tokio::test]
async fn test_conflicting_event_is_dead_lettered() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    cluster.replica_a.conflict_ids.insert("b7HFMWjj3im".to_string());
    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");

    assert!(
        cluster.wait_for_dead_letters(1).await,
        "conflicting event should be dead-lettered"
    );
    cluster
        .wait_for_entity(&cluster.replica_b_url, ORG_UNIT, "b7HFMWjj3im")
        .await
        .expect("conflict on one target must not block the other");
    assert_eq!(
        cluster
            .entity_status(&cluster.replica_a_url, ORG_UNIT, "b7HFMWjj3im")
            .await,
        404
    );
    assert_eq!(cluster.service.dead_letter_count(), 1);

    cluster.shutdown().await;
}

/// Case 3: an event that keeps failing against a healthy target is poison;
/// after the retry budget it is dead-lettered instead of wedging the
/// partition forever.
#[tokio::test]
async fn test_poison_event_on_healthy_target_is_dead_lettered_after_retries() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    // Health stays green while every import attempt fails
    cluster.replica_a.fail_next_imports(10);
    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");

    assert!(
        cluster.wait_for_dead_letters(1).await,
        "poison event should be dead-lettered once retries are spent"
    );
    cluster
        .wait_for_entity(&cluster.replica_b_url, ORG_UNIT, "b7HFMWjj3im")
        .await
        .expect("the healthy target still receives the event");
    assert_eq!(
        cluster
            .entity_status(&cluster.replica_a_url, ORG_UNIT, "b7HFMWjj3im")
            .await,
        404
    );

    cluster.shutdown().await;
}

/// Case 4: a single transient 500 is absorbed by the retry budget and never
/// reaches the dead letter store.
#[tokio::test]
async fn test_transient_import_failure_retries_within_budget() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    cluster.replica_a.fail_next_imports(1);
    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");

    cluster
        .wait_for_entity(&cluster.replica_a_url, ORG_UNIT, "b7HFMWjj3im")
        .await
        .expect("retry should deliver after the injected failure");
    assert_eq!(cluster.service.dead_letter_count(), 0);

    cluster.shutdown().await;
}
