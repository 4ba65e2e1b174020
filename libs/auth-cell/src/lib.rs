pub mod handlers;
pub mod router;
pub mod session;

pub use router::auth_routes;
pub use session::{AuthContext, AuthError, AuthSession, FileSessionStore, MemorySessionStore, SessionStore};
