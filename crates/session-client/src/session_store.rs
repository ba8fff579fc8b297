//! Observable holder of the signed-in account.
//!
//! Holds the last identity the service confirmed, never a speculative one.
//! Consumers (route guards, navigation) subscribe and react to changes.

use crate::errors::ClientError;
use common::types::{Role, UserView};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

/// Process-wide session state.
///
/// Cheap to clone; every clone observes and updates the same state.
#[derive(Clone)]
pub struct SessionStore {
    sender: Arc<watch::Sender<Option<UserView>>>,
    initialized: Arc<OnceCell<()>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
            initialized: Arc::new(OnceCell::new()),
        }
    }

    /// The current account, if signed in.
    pub fn current(&self) -> Option<UserView> {
        self.sender.borrow().clone()
    }

    pub fn set(&self, user: UserView) {
        tracing::debug!(target: "client.session", role = %user.role, "Session identity updated");
        self.sender.send_replace(Some(user));
    }

    pub fn clear(&self) {
        if self.sender.borrow().is_some() {
            tracing::debug!(target: "client.session", "Session identity cleared");
        }
        self.sender.send_replace(None);
    }

    pub fn is_authenticated(&self) -> bool {
        self.sender.borrow().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.sender
            .borrow()
            .as_ref()
            .is_some_and(|user| user.role == Role::Admin)
    }

    /// Observe changes.
    pub fn subscribe(&self) -> SessionReceiver {
        SessionReceiver(self.sender.subscribe())
    }

    /// Run `init` the first time this is called on any clone of the store.
    ///
    /// Later and concurrent calls wait for the first run to finish and do
    /// nothing. Returns `true` for the call that ran `init`.
    pub async fn initialize_with<F, Fut>(&self, init: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut ran = false;
        let flag = &mut ran;
        self.initialized
            .get_or_init(|| async move {
                init().await;
                *flag = true;
            })
            .await;
        ran
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Subscription to a [`SessionStore`].
#[derive(Clone)]
pub struct SessionReceiver(watch::Receiver<Option<UserView>>);

impl SessionReceiver {
    /// The current account. Does not hold the borrow.
    pub fn current(&self) -> Option<UserView> {
        self.0.borrow().clone()
    }

    /// Wait for the next change.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ChannelClosed` once every store clone is dropped.
    pub async fn changed(&mut self) -> Result<(), ClientError> {
        self.0.changed().await.map_err(|_| ClientError::ChannelClosed)
    }
}

impl std::fmt::Debug for SessionReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionReceiver")
            .field("authenticated", &self.0.borrow().is_some())
            .finish()
    }
}
