use std::time::Duration;

use metasync::MetadataKind;
use serde_json::Value;
use serial_test::serial;
use tokio::time::sleep;
use tokio::time::Instant;

use crate::common::free_port;
use crate::common::SyncTestCluster;

const ORG_UNIT: MetadataKind = MetadataKind::OrganisationUnit;

async fn start_admin_cluster() -> (SyncTestCluster, String) {
    let port = free_port();
    let cluster = SyncTestCluster::start_with(|config| {
        config.monitoring.prometheus_enabled = true;
        config.monitoring.prometheus_port = port;
    })
    .await;
    let admin_url = format!("http://127.0.0.1:{port}");
    wait_for_admin(&cluster, &admin_url).await;
    (cluster, admin_url)
}

async fn wait_for_admin(
    cluster: &SyncTestCluster,
    admin_url: &str,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(response) = cluster.client.get(format!("{admin_url}/status")).send().await {
            if response.status().as_u16() == 200 {
                return;
            }
        }
        assert!(
            Instant::now() < deadline,
            "admin server did not come up on {admin_url}"
        );
        sleep(Duration::from_millis(50)).await;
    }
}

/// Case 1: /status reports the pipeline the way an operator reads it:
/// sequences, bookmark, per-target cursors and health.
#[tokio::test]
#[serial]
async fn test_status_endpoint_reports_pipeline_state() {
    crate::enable_logger();
    let (cluster, admin_url) = start_admin_cluster().await;

    let stamp = cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");
    cluster.wait_for_sequence(1).await;
    cluster
        .service
        .wait_for_convergence(1)
        .await
        .expect("single event should converge");

    let status: Value = cluster
        .client
        .get(format!("{admin_url}/status"))
        .send()
        .await
        .expect("Should succeed to query /status")
        .json()
        .await
        .expect("Should succeed to decode /status");

    assert_eq!(status["lastSequence"], 1);
    assert_eq!(status["minDeliveredSequence"], 1);
    assert_eq!(status["deadLetterCount"], 0);
    assert!(status["queueDepth"].is_u64());
    assert_eq!(status["captureBookmark"]["updatedFrontier"], stamp.as_str());

    let targets = status["targets"].as_array().expect("targets array");
    assert_eq!(targets.len(), 2);
    let mut names: Vec<&str> = targets.iter().filter_map(|t| t["name"].as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["replica-a", "replica-b"]);
    for target in targets {
        assert_eq!(target["degraded"], false);
        let cursors = target["cursors"].as_array().expect("cursor list");
        assert_eq!(cursors.len(), 2);
        for cursor in cursors {
            assert_eq!(cursor["sequence"], 1);
        }
    }

    cluster.shutdown().await;
}

/// Case 2: /metrics serves the prometheus exposition with the pipeline's
/// own series.
#[tokio::test]
#[serial]
async fn test_metrics_endpoint_exposes_prometheus_series() {
    crate::enable_logger();
    let (cluster, admin_url) = start_admin_cluster().await;

    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");
    cluster.wait_for_sequence(1).await;
    cluster
        .service
        .wait_for_convergence(1)
        .await
        .expect("single event should converge");

    let body = cluster
        .client
        .get(format!("{admin_url}/metrics"))
        .send()
        .await
        .expect("Should succeed to query /metrics")
        .text()
        .await
        .expect("Should succeed to read /metrics body");

    assert!(body.contains("metasync_queue_depth"), "missing queue depth gauge");
    assert!(body.contains("metasync_captured_events"), "missing capture counter");
    assert!(body.contains("metasync_delivered_events"), "missing delivery counter");

    cluster.shutdown().await;
}

/// Case 3: POST /reset clears the queue, cursors and bookmark; the next
/// poll re-captures everything still alive on the primary.
#[tokio::test]
#[serial]
async fn test_reset_triggers_full_resync() {
    crate::enable_logger();
    let (cluster, admin_url) = start_admin_cluster().await;

    cluster
        .primary
        .create_org_unit("b7HFMWjj3im", "ACME", "Acme Clinic", "Acme");
    cluster.wait_for_sequence(1).await;
    cluster
        .service
        .wait_for_convergence(1)
        .await
        .expect("initial delivery should converge");

    let response = cluster
        .client
        .post(format!("{admin_url}/reset"))
        .send()
        .await
        .expect("Should succeed to POST /reset");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Should succeed to decode /reset");
    assert_eq!(body["status"], "reset");
    assert_eq!(body["nextSequence"], 2);

    // Cleared bookmark: the surviving entity is captured again under a new
    // sequence and re-imported idempotently
    cluster.wait_for_sequence(2).await;
    cluster
        .service
        .wait_for_convergence(2)
        .await
        .expect("resync should converge");
    for replica_url in [&cluster.replica_a_url, &cluster.replica_b_url] {
        let entity = cluster
            .fetch_entity(replica_url, ORG_UNIT, "b7HFMWjj3im")
            .await
            .expect("entity should survive the resync");
        assert_eq!(entity["name"], "Acme Clinic");
    }
    assert_eq!(cluster.service.dead_letter_count(), 0);

    cluster.shutdown().await;
}
