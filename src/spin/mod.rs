//! Spin workflow: sign-in, reward ledger, the per-attempt engine and the
//! per-wallet runner.

pub mod auth;
pub mod engine;
pub mod ledger;
pub mod runner;

pub use auth::AuthSession;
pub use engine::{
    check_funding, gas_limit_with_margin, required_funds, SpinEngine, VoucherResponse,
};
pub use ledger::{diff, PrizeLedger};
pub use runner::WalletRunner;
