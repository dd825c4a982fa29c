pub mod fields;
pub mod outcome;
pub mod prize;
pub mod voucher;

pub use outcome::{Credential, RunResult, RunStatus, SpinCounters, SpinOutcome, NO_PRIZE, NO_REWARD};
pub use prize::{Prize, PrizeKey, PrizeSnapshot};
pub use voucher::SpinVoucher;
