//! Queue module: the mutation queue, the quarantine, and the retry policy.

mod ledger;
mod mutation;
mod quarantine;
mod retry;
mod seq_map;

pub use ledger::Ledger;
pub use mutation::MutationQueue;
pub use quarantine::QuarantineStore;
pub use retry::RetryPolicy;
