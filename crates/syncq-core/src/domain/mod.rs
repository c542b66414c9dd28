//! Domain layer - ドメインモデル
//!
//! ids, action, dispatch outcome, coordinator state, run report, errors, events

pub mod action;
pub mod errors;
pub mod events;
pub mod ids;
pub mod outcome;
pub mod report;
pub mod state;

pub use self::action::{ActionKind, NewAction, QuarantinedAction, QueuedAction};
pub use self::errors::{StoreError, SyncError};
pub use self::events::SyncEvent;
pub use self::ids::{ActionId, Id, IdMarker, ParseIdError, RunId};
pub use self::outcome::DispatchResult;
pub use self::report::{RunFailure, RunReport};
pub use self::state::{CONNECTIVITY_LOST, Progress, RunOutcome, SyncState, SyncStatus};
