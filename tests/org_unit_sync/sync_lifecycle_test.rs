use std::time::Duration;

use metasync::MetadataKind;
use serde_json::Value;
use tokio::time::sleep;
use tokio::time::Instant;

use crate::common::SyncTestCluster;
use crate::common::CONVERGENCE_SLA_MS;
use crate::common::POLL_INTERVAL_MS;

const ORG_UNIT: MetadataKind = MetadataKind::OrganisationUnit;

/// Case 1: a freshly created organisation unit reaches every replica within
/// the consistency window, with its captured fields intact.
#[tokio::test]
async fn test_create_propagates_to_all_replicas_within_window() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    // Nothing has been captured yet, so neither replica may know the id
    assert_eq!(
        cluster
            .entity_status(&cluster.replica_a_url, ORG_UNIT, "b7HFMWjj3im")
            .await,
        404
    );
    assert_eq!(
        cluster
            .entity_status(&cluster.replica_b_url, ORG_UNIT, "b7HFMWjj3im")
            .await,
        404
    );

    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");

    for replica_url in [&cluster.replica_a_url, &cluster.replica_b_url] {
        let entity = cluster
            .wait_for_entity(replica_url, ORG_UNIT, "b7HFMWjj3im")
            .await
            .expect("organisation unit should reach the replica within the consistency window");
        assert_eq!(entity["name"], "Acme Clinic");
        assert_eq!(entity["shortName"], "Acme");
        assert_eq!(entity["code"], "ACME");
    }
    assert_eq!(cluster.service.dead_letter_count(), 0);

    cluster.shutdown().await;
}

/// Case 2: an update captured after the create overwrites the replica's
/// copy, never the other way around.
#[tokio::test]
async fn test_update_overwrites_previous_state() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");
    cluster
        .wait_for_entity(&cluster.replica_a_url, ORG_UNIT, "b7HFMWjj3im")
        .await
        .expect("create should land before the update is issued");

    cluster.primary.rename_org_unit("b7HFMWjj3im", "Acme Medical Centre");

    for replica_url in [&cluster.replica_a_url, &cluster.replica_b_url] {
        let entity = wait_for_field(&cluster, replica_url, "b7HFMWjj3im", "name", "Acme Medical Centre").await;
        assert_eq!(entity["code"], "ACME");
        assert_eq!(entity["shortName"], "Acme");
    }
    assert_eq!(cluster.service.dead_letter_count(), 0);

    cluster.shutdown().await;
}

/// Case 3: create then delete runs the full lifecycle; the entity exists on
/// every replica in between and is gone everywhere afterwards.
#[tokio::test]
async fn test_create_then_delete_lifecycle() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    cluster
        .primary
        .create_org_unit("fdc6uOvgoji", "EVIL_CORP", "Evil Corp Hospital", "EvilCorp");
    for replica_url in [&cluster.replica_a_url, &cluster.replica_b_url] {
        cluster
            .wait_for_entity(replica_url, ORG_UNIT, "fdc6uOvgoji")
            .await
            .expect("organisation unit should reach the replica before deletion");
    }

    cluster.primary.delete(ORG_UNIT, "fdc6uOvgoji");

    for replica_url in [&cluster.replica_a_url, &cluster.replica_b_url] {
        assert!(
            cluster
                .wait_for_absence(replica_url, ORG_UNIT, "fdc6uOvgoji")
                .await,
            "deletion should reach the replica within the consistency window"
        );
    }
    assert_eq!(cluster.service.dead_letter_count(), 0);

    cluster.shutdown().await;
}

/// Case 4: replaying an unchanged entity (new lastUpdated, same content) is
/// idempotent on the replicas and dead-letters nothing.
#[tokio::test]
async fn test_idempotent_replay_of_identical_content() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");
    cluster
        .wait_for_entity(&cluster.replica_a_url, ORG_UNIT, "b7HFMWjj3im")
        .await
        .expect("create should land before the replay");

    // Same content, newer stamp: captured as a second event
    cluster.primary.touch(ORG_UNIT, "b7HFMWjj3im");
    cluster.wait_for_sequence(2).await;
    cluster
        .service
        .wait_for_convergence(2)
        .await
        .expect("replayed event should converge within the window");

    for replica_url in [&cluster.replica_a_url, &cluster.replica_b_url] {
        let entity = cluster
            .fetch_entity(replica_url, ORG_UNIT, "b7HFMWjj3im")
            .await
            .expect("entity should still be readable after the replay");
        assert_eq!(entity["name"], "Acme Clinic");
        assert_eq!(entity["code"], "ACME");
    }
    assert_eq!(cluster.service.dead_letter_count(), 0);

    cluster.shutdown().await;
}

/// Case 5: a delete hot on the heels of a create leaves no residue; the two
/// events share a partition, so order is preserved per entity.
#[tokio::test]
async fn test_create_followed_by_quick_delete_leaves_no_residue() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    cluster
        .primary
        .create_org_unit("fdc6uOvgoji", "EVIL_CORP", "Evil Corp Hospital", "EvilCorp");
    cluster.wait_for_sequence(1).await;
    cluster.primary.delete(ORG_UNIT, "fdc6uOvgoji");
    cluster.wait_for_sequence(2).await;

    for replica_url in [&cluster.replica_a_url, &cluster.replica_b_url] {
        assert!(
            cluster
                .wait_for_absence(replica_url, ORG_UNIT, "fdc6uOvgoji")
                .await,
            "entity must end up absent on every replica"
        );
    }
    assert_eq!(cluster.service.dead_letter_count(), 0);

    cluster.shutdown().await;
}

async fn wait_for_field(
    cluster: &SyncTestCluster,
    replica_url: &str,
    id: &str,
    field: &str,
    want: &str,
) -> Value {
    let deadline = Instant::now() + Duration::from_millis(CONVERGENCE_SLA_MS);
    loop {
        if let Some(entity) = cluster.fetch_entity(replica_url, ORG_UNIT, id).await {
            if entity[field] == want {
                return entity;
            }
        }
        assert!(
            Instant::now() < deadline,
            "{field} never became {want:?} on {replica_url} within the consistency window"
        );
        sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}
