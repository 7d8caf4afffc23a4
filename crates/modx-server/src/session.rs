//! Connected-wallet session
//!
//! One `Session` is shared by every service. It is the only place the
//! current account lives; consumers read it per call or subscribe to
//! changes.

use std::sync::Arc;

use alloy_primitives::Address;
use serde::Serialize;
use tokio::sync::watch;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionState {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
}

#[derive(Clone)]
pub struct Session {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn connect(&self, account: Address, chain_id: u64) {
        tracing::info!(account = %account, chain_id = %chain_id, "Wallet connected");
        self.tx.send_replace(SessionState {
            account: Some(account),
            chain_id: Some(chain_id),
        });
    }

    pub fn disconnect(&self) {
        tracing::info!("Wallet disconnected");
        self.tx.send_replace(SessionState::default());
    }

    pub fn switch_account(&self, account: Address) {
        tracing::info!(account = %account, "Account switched");
        self.tx.send_modify(|s| s.account = Some(account));
    }

    pub fn switch_chain(&self, chain_id: u64) {
        tracing::info!(chain_id = %chain_id, "Chain switched");
        self.tx.send_modify(|s| s.chain_id = Some(chain_id));
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SessionState {
        *self.tx.borrow()
    }

    pub fn account(&self) -> Option<Address> {
        self.current().account
    }

    pub fn require_account(&self) -> AppResult<Address> {
        self.account().ok_or(AppError::NotConnected)
    }
}
