//! Command line dispatch integration tests
//!
//! Runs parsed command lines against a recording executor and checks what
//! the user sees.

use clap::Parser;
use pretty_assertions::assert_eq;
use tunnelmgr::app::{dispatch, error_report, Settings};
use tunnelmgr::cli::Cli;
use tunnelmgr::{TunnelMgr, TunnelMgrConfig};
use tunnelmgr_test::{
    link_listing, sample_vxlan_listing, LinkFixture, RecordingExecutor, LINK_EXISTS_STDERR,
};

async fn run_with(executor: &RecordingExecutor, args: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(std::iter::once("tunnelmgr").chain(args.iter().copied()))?;
    let settings = Settings::resolve(&cli, &TunnelMgrConfig::default());
    let mgr = TunnelMgr::with_commands(executor, settings.command_builder());

    let mut out = Vec::new();
    dispatch(&mgr, &settings, &cli.command, &mut out).await?;
    Ok(String::from_utf8(out)?)
}

fn listing_executor(kind: &str, output: String) -> RecordingExecutor {
    RecordingExecutor::new().with_stdout(format!("ip -d link show type {}", kind), output)
}

#[tokio::test]
async fn test_create_prints_confirmation() {
    let executor = RecordingExecutor::new();
    let out = run_with(
        &executor,
        &[
            "create",
            "--vni",
            "100",
            "--src-host",
            "10.0.0.1",
            "--dst-host",
            "10.0.0.2",
            "--bridge-name",
            "testBridge",
            "--dev",
            "bond0",
        ],
    )
    .await
    .unwrap();

    assert_eq!(out, "Tunnel created successfully.\n");
    executor
        .verifier()
        .assert_command_executed("dev bond0 dstport 4789")
        .unwrap();
}

#[tokio::test]
async fn test_create_failure_reports_step() {
    let executor = RecordingExecutor::new().fail_at(1, 2, LINK_EXISTS_STDERR);
    let err = run_with(
        &executor,
        &[
            "create",
            "--vni",
            "100",
            "--src-host",
            "10.0.0.1",
            "--dst-host",
            "10.0.0.2",
            "--bridge-name",
            "testBridge",
        ],
    )
    .await
    .unwrap_err();

    let message = error_report(&err);
    assert!(message.starts_with("Failed to create tunnel vxlan100: create step 1/3 failed"));
    assert!(message.contains("RTNETLINK answers: File exists"));
    assert_eq!(executor.call_count(), 1);
}

#[tokio::test]
async fn test_invalid_parameters_run_nothing() {
    let executor = RecordingExecutor::new();
    let err = run_with(
        &executor,
        &[
            "create",
            "--vni",
            "16777216",
            "--src-host",
            "10.0.0.1",
            "--dst-host",
            "10.0.0.2",
            "--bridge-name",
            "testBridge",
        ],
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("vni"));
    assert_eq!(executor.call_count(), 0);
}

#[tokio::test]
async fn test_cleanup_prints_confirmation() {
    let executor = RecordingExecutor::new();
    let out = run_with(
        &executor,
        &["cleanup", "--vni", "100", "--bridge-name", "testBridge"],
    )
    .await
    .unwrap();

    assert_eq!(out, "Tunnel cleaned up successfully.\n");
    executor.verifier().assert_command_count(2).unwrap();
}

#[tokio::test]
async fn test_validate_prints_confirmation() {
    let executor = RecordingExecutor::new();
    let out = run_with(
        &executor,
        &[
            "-t",
            "geneve",
            "validate",
            "--src-host",
            "10.0.0.1",
            "--dst-host",
            "10.0.0.2",
            "--vni",
            "7",
        ],
    )
    .await
    .unwrap();

    assert_eq!(out, "Connectivity to GENEVE VNI 7 at 10.0.0.2 is successful.\n");
    executor
        .verifier()
        .assert_sequence(&["ip link show dev geneve7", "ping -c 1 -W 3 -I 10.0.0.1 10.0.0.2"])
        .unwrap();
}

#[tokio::test]
async fn test_list_table() {
    let executor = listing_executor("vxlan", sample_vxlan_listing());
    let out = run_with(&executor, &["list", "--fields", "ifname", "vni", "bridge", "state"])
        .await
        .unwrap();

    assert_eq!(
        out,
        " ifname  | vni |   bridge   |  state\n\
         ---------+-----+------------+--------\n\
         vxlan100 | 100 | testBridge | UNKNOWN\n\
         vxlan200 | 200 |            |  DOWN\n"
    );
}

#[tokio::test]
async fn test_list_json_all_fields() {
    let executor = listing_executor("vxlan", sample_vxlan_listing());
    let out = run_with(&executor, &["list", "--format", "json"]).await.unwrap();

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["ifname"], "vxlan100");
    assert_eq!(records[0]["src_host"], "10.0.0.1");
    assert_eq!(records[0]["dst_port"], 4789);
    assert_eq!(records[1]["dst_host"], "fd00::2");
    assert_eq!(records[1]["dst_port"], 8472);
    assert!(records[1]["bridge"].is_null());
}

#[tokio::test]
async fn test_list_geneve_csv() {
    let output = link_listing(&[LinkFixture::geneve(3, 7), LinkFixture::geneve(4, 8)]);
    let executor = listing_executor("geneve", output);
    let out = run_with(
        &executor,
        &["--tunnel-type", "geneve", "list", "--format", "csv", "--fields", "ifname,dst_port"],
    )
    .await
    .unwrap();

    assert_eq!(out, "ifname,dst_port\r\ngeneve7,6081\r\ngeneve8,6081\r\n");
}

#[tokio::test]
async fn test_list_raw_is_unmodified() {
    let raw = sample_vxlan_listing();
    let executor = listing_executor("vxlan", raw.clone());
    let out = run_with(&executor, &["list", "--format", "raw"]).await.unwrap();
    assert_eq!(out, raw);
}

#[tokio::test]
async fn test_list_empty() {
    let executor = RecordingExecutor::new();
    assert_eq!(run_with(&executor, &["list"]).await.unwrap(), "");

    let out = run_with(&executor, &["list", "--format", "json"]).await.unwrap();
    assert_eq!(out, "[]\n");
}

#[tokio::test]
async fn test_list_unknown_field_runs_nothing() {
    let executor = RecordingExecutor::new();
    let err = run_with(&executor, &["list", "--fields", "mtu"]).await.unwrap_err();

    assert!(err.to_string().contains("unknown field 'mtu'"));
    assert_eq!(executor.call_count(), 0);
}
