//! Cart session credentials: persistence and bootstrap.
//!
//! # Architecture
//!
//! - [`SessionStore`] is the only owner of the persisted (token, nonce) pair
//! - [`SessionBootstrapper`] guarantees a valid pair before a mutating call and
//!   coalesces concurrent bootstraps into one request
//!
//! Stores are injected as `Arc<dyn SessionStore>` so tests and embedders can
//! swap the backing medium.

mod bootstrap;
mod store;

pub use bootstrap::SessionBootstrapper;
pub use store::{FileSessionStore, MemorySessionStore};

use rooh_core::{CredentialUpdate, SessionCredentials};

/// Persistent storage for cart session credentials.
///
/// Implementations never fail from the caller's point of view: storage
/// problems are logged and degrade to "no credentials", which the
/// bootstrapper recovers from with a fresh session.
pub trait SessionStore: Send + Sync {
    /// Current credentials. A nonce past its TTL reads as absent; the token
    /// is returned regardless.
    fn load(&self) -> SessionCredentials;

    /// Merge captured credentials. Absent fields keep their cached value.
    fn save(&self, update: CredentialUpdate);

    /// Forget both credentials.
    fn clear(&self);
}
