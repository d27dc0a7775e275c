/// Storage collaborators
///
/// Trait seams for the credential store and the session store, with their
/// Postgres, Redis, and in-memory implementations.

mod credentials;
mod memory;
mod session;

pub use credentials::{CredentialStore, PgCredentialStore, Principal};
pub use memory::{InMemoryCredentialStore, InMemorySessionStore};
pub use session::{RedisSessionStore, SessionStore};
