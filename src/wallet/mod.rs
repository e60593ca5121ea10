pub mod payments;

use tracing::{debug, warn};

use crate::api::models::{default_currency, WalletBalance};
use crate::api::BalanceSource;
use crate::error::ClientError;
use crate::live::LiveEvent;

/// What the caller must do after a wallet event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletAction {
    None,
    /// Re-fetch `GET /wallet/balance`; the event payload is not trusted.
    Refresh,
}

/// Last known wallet balance for the signed-in session.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletState {
    pub balance: f64,
    pub currency: String,
    pub loading: bool,
}

impl Default for WalletState {
    fn default() -> Self {
        WalletState {
            balance: 0.0,
            currency: default_currency(),
            loading: false,
        }
    }
}

impl WalletState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-numeric balances and missing currencies leave the current value.
    pub fn apply_update(&mut self, balance: Option<f64>, currency: Option<&str>) {
        if let Some(b) = balance.filter(|b| b.is_finite()) {
            self.balance = b;
        }
        if let Some(c) = currency.filter(|c| !c.is_empty()) {
            self.currency = c.to_string();
        }
    }

    pub fn apply_event(&mut self, event: &LiveEvent) -> WalletAction {
        match event {
            LiveEvent::WalletUpdate { balance, currency } => {
                self.apply_update(*balance, currency.as_deref());
                WalletAction::None
            }
            LiveEvent::TransactionUpdate(_) => WalletAction::Refresh,
            _ => WalletAction::None,
        }
    }

    /// A failed refresh keeps the last good state.
    pub fn apply_refresh(&mut self, result: Result<WalletBalance, ClientError>) {
        self.loading = false;
        match result {
            Ok(w) => {
                self.balance = w.balance;
                self.currency = if w.currency.is_empty() {
                    default_currency()
                } else {
                    w.currency
                };
            }
            Err(e) => warn!("Balance refresh failed, keeping {:.2}: {}", self.balance, e),
        }
    }

    pub async fn refresh<S: BalanceSource + ?Sized>(&mut self, source: &S) {
        self.loading = true;
        let result = source.fetch_balance().await;
        self.apply_refresh(result);
        debug!("Wallet balance: {:.2} {}", self.balance, self.currency);
    }

    /// Session ended.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
