pub mod adapters;
pub mod batch;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod report;
pub mod signing;
pub mod spin;

pub use batch::{BatchRunner, LiveWalletJob, WalletJob, WalletSource};
pub use config::AppConfig;
pub use domain::{RunResult, RunStatus, SpinOutcome};
pub use error::{HubspinError, Result};
pub use report::Report;
pub use signing::Wallet;
pub use spin::{AuthSession, PrizeLedger, SpinEngine, WalletRunner};
