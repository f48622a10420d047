// Session lifecycle module
// Token persistence, the cached store, and single-flight refresh

mod refresher;
mod storage;
mod store;
mod types;

pub use refresher::TokenRefresher;
pub use storage::{MemoryStorage, SqliteStorage, TokenStorage};
pub use store::{LogRedirect, LoginRedirect, TokenStore};
pub use types::{SessionEvent, TokenResponse, TokenSet, DEFAULT_TOKEN_TYPE};
