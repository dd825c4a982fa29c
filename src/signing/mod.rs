pub mod challenge;
pub mod signature;
pub mod wallet;

pub use challenge::build_challenge_message;
pub use signature::{normalize, VoucherSignature};
pub use wallet::Wallet;
