pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod input;
pub mod loader;
pub mod local_store;
pub mod persisted;
pub mod persisted_store;
pub mod rate_limit;
pub mod reconciler;
pub mod router;
pub mod store;
pub mod sync;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::{StoreError, SyncError};
pub use identity::{load_or_create_user, LocalUser};
pub use loader::{check_session, load_puzzle, LoadError, LoadTracker, SessionCheck};
pub use local_store::{LocalStore, MemoryLocalStore};
pub use persisted::CompletionStatus;
pub use persisted_store::PersistedStore;
pub use reconciler::{SessionEvent, SessionHooks, SessionReconciler};
pub use router::GameRoute;
pub use store::{InMemorySessionStore, SharedSessionStore};
pub use sync::{LocalSessionSync, RemoteSessionSync, SessionSync, SyncMode};
pub use view::SessionView;
