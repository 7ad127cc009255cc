pub mod cookie;
pub mod credentials;
pub mod gate;
pub mod session;
pub mod store;

pub use cookie::{CookieSessionStore, SessionCipher, SESSION_COOKIE_NAME};
pub use credentials::{CredentialStore, HashedCredentials, PasswordHash};
pub use gate::{Access, SessionContext, SessionGate};
pub use session::{PersistedSession, Session};
pub use store::{MemorySessionStore, SessionStore};
