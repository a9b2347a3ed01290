//! Handler flows against the bundled catalog and a temporary state file.

use std::path::Path;
use std::time::Duration;

use mapfetch_cli::{CliConfig, CliContext, CliError, bootstrap, handlers};
use mapfetch_core::{NodeId, NodeStatus};
use mapfetch_download::{OrchestratorPort, SimulationSettings};
use tokio_test::assert_ok;

fn config(state: &Path) -> CliConfig {
    CliConfig {
        catalog_path: None,
        state_path: state.to_path_buf(),
        config_path: None,
        simulation: SimulationSettings {
            chunk_size: 16 * 1024 * 1024,
            chunk_delay: Duration::from_millis(1),
            index_delay: Duration::from_millis(1),
        },
        fresh_bootstrap: false,
    }
}

fn context(state: &Path) -> CliContext {
    bootstrap(config(state)).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn download_group_then_status_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    {
        let ctx = context(&state);
        assert_ok!(handlers::download::execute(&ctx, &["France".to_string()], false).await);
        assert_eq!(
            ctx.orchestrator.status_of(&NodeId::new("France")),
            NodeStatus::OnDisk
        );
        assert_eq!(
            ctx.orchestrator.status_of(&NodeId::new("Europe")),
            NodeStatus::Partly
        );
    }

    let ctx = context(&state);
    assert_eq!(
        ctx.orchestrator.status_of(&NodeId::new("France_Provence")),
        NodeStatus::OnDisk
    );
    assert_ok!(handlers::status::execute(&ctx, None, false).await);
    assert_ok!(handlers::status::execute(&ctx, Some("Europe"), true).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_region_is_an_argument_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir.path().join("state.json"));

    let err = handlers::download::execute(&ctx, &["Atlantis".to_string()], false)
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Arguments(_)));
    assert_eq!(err.exit_code(), 2);

    let err = handlers::delete::execute(&ctx, "Atlantis").await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fresh_bootstrap_transfers_base_maps() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = bootstrap(config(&dir.path().join("state.json")).with_fresh_bootstrap(true)).unwrap();

    let status = assert_ok!(handlers::bootstrap::ensure_bootstrap(&ctx, 0).await);
    assert_eq!(status.total, 35 * 1024 * 1024);
    assert_eq!(status.downloaded, status.total);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bootstrap_failure_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = bootstrap(config(&dir.path().join("state.json")).with_fresh_bootstrap(true)).unwrap();
    ctx.engine.fail_bootstrap(mapfetch_core::ErrorCode::DownloadError);

    let err = handlers::bootstrap::ensure_bootstrap(&ctx, 0).await.unwrap_err();
    assert!(matches!(err, CliError::Download(_)));

    let dir = tempfile::tempdir().unwrap();
    let ctx = bootstrap(config(&dir.path().join("state.json")).with_fresh_bootstrap(true)).unwrap();
    ctx.engine.fail_bootstrap(mapfetch_core::ErrorCode::DownloadError);
    assert_ok!(handlers::bootstrap::ensure_bootstrap(&ctx, 1).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn locate_accept_downloads_region() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir.path().join("state.json"));

    assert_ok!(handlers::locate::execute(&ctx, 52.5, 13.4, true, false).await);
    assert_eq!(
        ctx.orchestrator.status_of(&NodeId::new("Germany_Berlin")),
        NodeStatus::OnDisk
    );

    // Nothing left to offer for the same spot.
    assert_ok!(handlers::locate::execute(&ctx, 52.5, 13.4, true, false).await);
    assert!(ctx.orchestrator.queue().is_idle());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mark_outdated_then_update() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir.path().join("state.json"));
    let kanto = NodeId::new("Japan_Kanto");

    assert_ok!(handlers::download::execute(&ctx, &["Japan_Kanto".to_string()], false).await);
    assert_ok!(handlers::outdated::mark(&ctx, "Japan_Kanto").await);
    assert_eq!(ctx.orchestrator.status_of(&kanto), NodeStatus::OnDiskOutOfDate);
    assert_ok!(handlers::outdated::list(&ctx).await);

    assert_ok!(handlers::outdated::update(&ctx, "Japan_Kanto").await);
    assert_eq!(ctx.orchestrator.status_of(&kanto), NodeStatus::OnDisk);

    assert_ok!(handlers::delete::execute(&ctx, "Japan_Kanto").await);
    assert_eq!(ctx.orchestrator.status_of(&kanto), NodeStatus::NotDownloaded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_transfer_reports_download_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&dir.path().join("state.json"));
    ctx.engine
        .fail_transfer(&NodeId::new("Japan_Kanto"), mapfetch_core::ErrorCode::NotEnoughFreeSpace);

    let err = handlers::download::execute(
        &ctx,
        &["Japan_Kanto".to_string(), "Germany_Berlin".to_string()],
        false,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CliError::Download(ref names) if names == "Japan_Kanto"));
    assert_eq!(
        ctx.orchestrator.status_of(&NodeId::new("Germany_Berlin")),
        NodeStatus::OnDisk
    );
}
