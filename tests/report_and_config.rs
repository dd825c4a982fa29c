use hubspin::config::AppConfig;
use hubspin::domain::{RunResult, RunStatus, NO_REWARD};
use hubspin::Report;
use std::path::PathBuf;

fn sample_results() -> Vec<RunResult> {
    vec![
        RunResult {
            address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
            streak: Some(7),
            status: RunStatus::Spun,
            reward: "LXP: 25, Voucher: 1 USDC".to_string(),
            detail: None,
        },
        RunResult {
            address: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
            streak: None,
            status: RunStatus::NoSpins,
            reward: NO_REWARD.to_string(),
            detail: None,
        },
        RunResult::failed("-", RunStatus::ProxyError, "proxy 10.0.0.1:8080 unreachable"),
    ]
}

#[test]
fn csv_export_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");

    Report::new(sample_results()).write_csv(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "address,streak,status,reward");
    assert_eq!(
        lines[1],
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266,7,Spun,\"LXP: 25, Voucher: 1 USDC\""
    );
    assert_eq!(
        lines[2],
        "0x70997970C51812dc3A010C7d01b50e0d17dc79C8,,No spins,—"
    );
    assert_eq!(lines[3], "-,,Proxy error,—");
}

#[test]
fn json_export_keeps_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");

    Report::new(sample_results()).write_json(&path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let rows = value.as_array().unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["streak"], 7);
    assert_eq!(rows[0]["status"], "spun");
    assert!(rows[1]["streak"].is_null());
    assert!(rows[1].get("detail").is_none());
    assert_eq!(rows[2]["status"], "proxy_error");
    assert_eq!(rows[2]["detail"], "proxy 10.0.0.1:8080 unreachable");
}

#[test]
fn table_shows_streak_or_dash() {
    let table = Report::new(sample_results()).render_table();
    assert!(table.contains("7 d."));
    assert!(table.contains("Proxy error"));
    assert!(table.contains("No spins"));
}

#[test]
fn config_file_overrides_only_what_it_sets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hubspin.toml");
    std::fs::write(
        &path,
        r#"
[spin]
max_spins_per_wallet = 3
default_gas = 300000

[batch]
concurrency = 4
delay_min_secs = 1
delay_max_secs = 2

[files]
private_keys = "wallets/keys.txt"
"#,
    )
    .unwrap();

    let config = AppConfig::load_file(&path).unwrap();
    assert_eq!(config.spin.max_spins_per_wallet, 3);
    assert_eq!(config.spin.default_gas, 300_000);
    assert_eq!(config.batch.concurrency, 4);
    assert_eq!(config.files.private_keys, PathBuf::from("wallets/keys.txt"));

    // defaults survive
    assert_eq!(config.spin.funding_margin_pct, 15);
    assert_eq!(config.spin.gas_limit_margin_pct, 10);
    assert_eq!(config.files.proxies, PathBuf::from("proxies.txt"));
    assert_eq!(config.chain.chain_id, 59144);
    assert_eq!(config.auth.chain_id, 1);
    assert!(config.validate().is_ok());
}

#[test]
fn missing_config_dir_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load_from(dir.path().join("nowhere")).unwrap();
    assert_eq!(config.prizes.page_size, 50);
    assert_eq!(config.activation.ready_attempts, 10);
    assert_eq!(config.batch.delay_min_secs, 15);
    assert_eq!(config.batch.delay_max_secs, 45);
}
