// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session state around an external identity provider
//!
//! [`Auth`] holds the current bearer token, publishes every change on a
//! [`watch`] channel and keeps exactly one renewal task scheduled for the
//! token's expiry. The OAuth flow itself stays behind [`IdentityProvider`].

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::AuthError;

/// Receiving end of the token-changed channel
pub type TokenWatch = watch::Receiver<Option<String>>;

/// Result of a successful authorization or renewal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: Duration,
}

/// The OAuth/OIDC flow the session delegates to
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the interactive sign-in flow
    async fn authorize(&self) -> Result<TokenGrant, AuthError>;

    /// Silently obtain a fresh token for the existing session
    async fn renew(&self) -> Result<TokenGrant, AuthError>;

    /// End the session on the provider's side
    async fn end_session(&self) {}
}

#[derive(Default)]
struct Session {
    access_token: Option<String>,
    expires_at: Option<Instant>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    session: Mutex<Session>,
    tokens: watch::Sender<Option<String>>,
    renewal: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut renewal) = self.renewal.lock()
            && let Some(handle) = renewal.take()
        {
            handle.abort();
        }
    }
}

/// Bearer-token session with scheduled silent renewal
#[derive(Clone)]
pub struct Auth {
    inner: Arc<Inner>,
}

impl Auth {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tokens, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                provider,
                session: Mutex::new(Session::default()),
                tokens,
                renewal: Mutex::new(None),
            }),
        }
    }

    /// The current token, `None` when signed out or expired
    pub fn access_token(&self) -> Option<String> {
        let session = self.inner.session.lock().ok()?;
        match session.expires_at {
            Some(expires_at) if Instant::now() < expires_at => session.access_token.clone(),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Subscribe to token changes
    ///
    /// The channel fires on every issued, renewed or cleared token.
    pub fn subscribe(&self) -> TokenWatch {
        self.inner.tokens.subscribe()
    }

    /// Run the interactive sign-in flow and start a session
    pub async fn login(&self) -> Result<(), AuthError> {
        let grant = self.inner.provider.authorize().await?;
        self.set_session(grant);
        Ok(())
    }

    /// Silently renew the session
    ///
    /// A failed renewal is fatal for the session: local state is cleared and
    /// subscribers see the token go away.
    pub async fn renew_session(&self) -> Result<(), AuthError> {
        match self.inner.provider.renew().await {
            Ok(grant) => {
                self.set_session(grant);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Session renewal failed, signing out");
                self.clear_sign_in();
                Err(e)
            }
        }
    }

    /// Sign out locally and with the provider
    pub async fn logout(&self) {
        self.clear_sign_in();
        self.inner.provider.end_session().await;
        info!("Signed out");
    }

    fn set_session(&self, grant: TokenGrant) {
        let expires_at = Instant::now() + grant.expires_in;

        if let Ok(mut session) = self.inner.session.lock() {
            session.access_token = Some(grant.access_token.clone());
            session.expires_at = Some(expires_at);
        }

        self.inner.tokens.send_replace(Some(grant.access_token));
        debug!(expires_in = ?grant.expires_in, "Session started");

        self.schedule_renewal(expires_at);
    }

    /// Replace any scheduled renewal with one firing at `expires_at`
    fn schedule_renewal(&self, expires_at: Instant) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };

            // Detach ourselves so rescheduling does not abort this task
            if let Ok(mut renewal) = inner.renewal.lock() {
                renewal.take();
            }

            let auth = Auth { inner };
            let _ = auth.renew_session().await;
        });

        if let Ok(mut renewal) = self.inner.renewal.lock()
            && let Some(previous) = renewal.replace(handle)
        {
            previous.abort();
        }
    }

    fn clear_sign_in(&self) {
        if let Ok(mut session) = self.inner.session.lock() {
            *session = Session::default();
        }

        if let Ok(mut renewal) = self.inner.renewal.lock()
            && let Some(handle) = renewal.take()
        {
            handle.abort();
        }

        self.inner.tokens.send_replace(None);
    }
}
