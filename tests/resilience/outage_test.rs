use std::time::Duration;

use metasync::ConvergenceError;
use metasync::Error;
use metasync::MetadataKind;
use metasync::PropagationError;
use tokio::time::sleep;

use crate::common::SyncTestCluster;

const ORG_UNIT: MetadataKind = MetadataKind::OrganisationUnit;

/// Case 1: one replica going dark parks its partition while the others keep
/// receiving; recovery drains the backlog without losing anything.
#[tokio::test]
async fn test_replica_outage_parks_partition_and_recovers() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start().await;

    cluster.replica_a.set_down(true);
    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");
    cluster.wait_for_sequence(1).await;

    // The healthy replica converges on its own
    cluster
        .wait_for_entity(&cluster.replica_b_url, ORG_UNIT, "b7HFMWjj3im")
        .await
        .expect("healthy replica should receive the change during the outage");

    // The event stays queued for the dark replica; an outage is deferred,
    // never dead-lettered
    sleep(Duration::from_millis(500)).await;
    assert!(cluster.service.queue_depth() >= 1);
    assert_eq!(cluster.service.dead_letter_count(), 0);
    assert_eq!(
        cluster
            .entity_status(&cluster.replica_a_url, ORG_UNIT, "b7HFMWjj3im")
            .await,
        503
    );

    cluster.replica_a.set_down(false);
    cluster
        .wait_for_entity(&cluster.replica_a_url, ORG_UNIT, "b7HFMWjj3im")
        .await
        .expect("recovered replica should catch up from the queue");
    assert!(
        cluster.wait_for_empty_queue().await,
        "queue should compact away once every cursor passed the event"
    );
    assert_eq!(cluster.service.dead_letter_count(), 0);

    cluster.shutdown().await;
}

/// Case 2: an outage outlasting the consistency window surfaces as
/// WindowExceeded naming the lagging pair, not as silent data loss.
#[tokio::test]
async fn test_outage_breaches_consistency_window() {
    crate::enable_logger();
    let cluster = SyncTestCluster::start_with(|config| {
        config.delivery.consistency_window_ms = 1500;
    })
    .await;

    cluster.replica_a.set_down(true);
    cluster
        .primary
        .create_org_unit("fdc6uOvgoji", "EVIL_CORP", "Evil Corp Hospital", "EvilCorp");
    cluster.wait_for_sequence(1).await;

    let result = cluster.service.wait_for_convergence(1).await;
    match result {
        Err(Error::Propagation(PropagationError::Convergence(
            ConvergenceError::WindowExceeded { sequence, lagging, .. },
        ))) => {
            assert_eq!(sequence, 1);
            assert!(!lagging.is_empty());
            assert!(
                lagging.iter().all(|pair| pair.starts_with("replica-a/")),
                "only the dark target may lag: {lagging:?}"
            );
        }
        other => panic!("expected WindowExceeded, got {other:?}"),
    }

    // The change was never lost, only late
    cluster.replica_a.set_down(false);
    cluster
        .wait_for_entity(&cluster.replica_a_url, ORG_UNIT, "fdc6uOvgoji")
        .await
        .expect("change should still land once the replica recovers");

    cluster.shutdown().await;
}
