// Token store: in-memory cache over durable storage, plus the login redirect latch

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::auth::storage::{
    TokenStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_TYPE_KEY,
};
use crate::auth::types::{SessionEvent, TokenSet};

/// Capability invoked when the session must be re-established interactively.
///
/// Hosts with a navigation surface install their own implementation; the
/// default just reports the situation.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

/// Default redirect sink: a log line.
#[derive(Default)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self) {
        warn!("Session expired - redirecting to login");
    }
}

/// Holds the current token set. Reads are served from an in-memory cache;
/// writes go through to storage. Storage failures are logged and swallowed,
/// so a broken backend degrades to "no token" instead of taking requests down.
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    cache: RwLock<Option<TokenSet>>,
    redirect: Arc<dyn LoginRedirect>,
    redirected: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl TokenStore {
    /// Create a store hydrated from whatever the storage backend holds.
    pub fn new(storage: Arc<dyn TokenStorage>, redirect: Arc<dyn LoginRedirect>) -> Self {
        let cached = Self::load(storage.as_ref());
        let (events, _) = broadcast::channel(16);

        Self {
            storage,
            cache: RwLock::new(cached),
            redirect,
            redirected: AtomicBool::new(false),
            events,
        }
    }

    fn load(storage: &dyn TokenStorage) -> Option<TokenSet> {
        let access = Self::read_key(storage, ACCESS_TOKEN_KEY)?;
        let refresh = Self::read_key(storage, REFRESH_TOKEN_KEY);
        let token_type = Self::read_key(storage, TOKEN_TYPE_KEY);
        Some(TokenSet::from_parts(access, refresh, token_type))
    }

    fn read_key(storage: &dyn TokenStorage, key: &str) -> Option<String> {
        match storage.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!("Failed to read {key} from storage: {err:#}");
                None
            }
        }
    }

    /// Current access token, if any.
    pub async fn access_token(&self) -> Option<String> {
        let cache = self.cache.read().await;
        cache.as_ref().map(|t| t.access_token.clone())
    }

    /// Current refresh token, if any.
    pub async fn refresh_token(&self) -> Option<String> {
        let cache = self.cache.read().await;
        cache.as_ref().and_then(|t| t.refresh_token.clone())
    }

    /// Snapshot of the full token set.
    pub async fn token_set(&self) -> Option<TokenSet> {
        let cache = self.cache.read().await;
        cache.clone()
    }

    /// Value for the Authorization header, e.g. `Bearer eyJhb...`.
    pub async fn authorization_header(&self) -> Option<String> {
        let cache = self.cache.read().await;
        cache.as_ref().map(|t| t.authorization_header())
    }

    /// Header value for an outgoing request. With no token stored there is
    /// nothing to attach, so this asks for the login redirect and returns None.
    pub async fn authorization_header_or_redirect(&self) -> Option<String> {
        let header = self.authorization_header().await;
        if header.is_none() {
            self.request_login_redirect();
        }
        header
    }

    /// Replace the current token set. The cache is updated first so readers
    /// see the new tokens even if persistence fails. A successful save also
    /// re-arms the login redirect latch.
    pub async fn save(&self, tokens: TokenSet) {
        {
            let mut cache = self.cache.write().await;
            *cache = Some(tokens.clone());
        }

        self.write_key(ACCESS_TOKEN_KEY, &tokens.access_token);
        match &tokens.refresh_token {
            Some(refresh) => self.write_key(REFRESH_TOKEN_KEY, refresh),
            // A save without a refresh token must not leave a stale one behind
            None => self.remove_key(REFRESH_TOKEN_KEY),
        }
        self.write_key(TOKEN_TYPE_KEY, &tokens.token_type);

        self.redirected.store(false, Ordering::SeqCst);
        let _ = self.events.send(SessionEvent::TokensSaved);
        debug!("Token set saved");
    }

    /// Drop the session: clear the cache and remove the persisted keys.
    pub async fn clear(&self) {
        {
            let mut cache = self.cache.write().await;
            *cache = None;
        }

        self.remove_key(ACCESS_TOKEN_KEY);
        self.remove_key(REFRESH_TOKEN_KEY);
        self.remove_key(TOKEN_TYPE_KEY);

        let _ = self.events.send(SessionEvent::SessionCleared);
        debug!("Token set cleared");
    }

    /// Ask the host to send the user back to login. Latched: however many
    /// callers race here, the redirect fires once until the next save.
    pub fn request_login_redirect(&self) {
        if self
            .redirected
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.redirect.redirect_to_login();
            let _ = self.events.send(SessionEvent::LoginRedirectRequested);
        } else {
            debug!("Login redirect already requested, suppressing duplicate");
        }
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn write_key(&self, key: &str, value: &str) {
        if let Err(err) = self.storage.set(key, value) {
            warn!("Failed to write {key} to storage: {err:#}");
        }
    }

    fn remove_key(&self, key: &str) {
        if let Err(err) = self.storage.remove(key) {
            warn!("Failed to remove {key} from storage: {err:#}");
        }
    }
}
