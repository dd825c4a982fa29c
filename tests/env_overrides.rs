//! Runs in its own process so the variables set here never leak into
//! the file-layering tests.

use hubspin::config::AppConfig;

#[test]
fn environment_overrides_both_loaders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hubspin.toml");
    std::fs::write(&path, "[spin]\nmax_spins_per_wallet = 7\n").unwrap();

    std::env::set_var("HUBSPIN_SPIN__MAX_SPINS_PER_WALLET", "3");
    std::env::set_var("HUBSPIN_BATCH__CONCURRENCY", "2");

    let from_dir = AppConfig::load_from(dir.path().join("nowhere"));
    let from_file = AppConfig::load_file(&path);

    std::env::remove_var("HUBSPIN_SPIN__MAX_SPINS_PER_WALLET");
    std::env::remove_var("HUBSPIN_BATCH__CONCURRENCY");

    let from_dir = from_dir.unwrap();
    assert_eq!(from_dir.spin.max_spins_per_wallet, 3);
    assert_eq!(from_dir.batch.concurrency, 2);

    // env wins over the file
    let from_file = from_file.unwrap();
    assert_eq!(from_file.spin.max_spins_per_wallet, 3);
    assert_eq!(from_file.batch.concurrency, 2);
    assert_eq!(from_file.spin.default_gas, 250_000);
}
