//! Typed real-time events. Topic names are the backend's wire contract.

use serde_json::Value;

use crate::api::models::MatchRecord;

pub const MATCH_UPDATE: &str = "live:match:update";
pub const ODDS_UPDATE: &str = "live:odds:update";
pub const MATCH_STARTED: &str = "live:match:started";
pub const MATCH_ENDED: &str = "live:match:ended";
pub const WALLET_UPDATE: &str = "wallet:update";
pub const TRANSACTION_UPDATE: &str = "transaction:update";

#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Partial match fields to merge into the cached copy.
    MatchUpdate { match_id: String, patch: Value },
    /// New head-to-head prices for one match.
    OddsUpdate { match_id: String, odds: Value },
    MatchStarted(MatchRecord),
    MatchEnded { match_id: String },
    WalletUpdate {
        balance: Option<f64>,
        currency: Option<String>,
    },
    /// Only a hint that the balance changed; the payload is not trusted.
    TransactionUpdate(Value),
}

impl LiveEvent {
    /// Decode a wire event. Unknown topics and payloads without the
    /// identifying fields yield `None`.
    pub fn from_wire(topic: &str, payload: Value) -> Option<Self> {
        match topic {
            MATCH_UPDATE => {
                let match_id = match_id_of(&payload)?;
                Some(LiveEvent::MatchUpdate {
                    match_id,
                    patch: payload,
                })
            }
            ODDS_UPDATE => {
                let match_id = payload.get("matchId")?.as_str()?.to_string();
                let odds = payload.get("odds").cloned().unwrap_or(Value::Null);
                Some(LiveEvent::OddsUpdate { match_id, odds })
            }
            MATCH_STARTED => {
                let record = MatchRecord::new(payload);
                record.id()?;
                Some(LiveEvent::MatchStarted(record))
            }
            MATCH_ENDED => Some(LiveEvent::MatchEnded {
                match_id: match_id_of(&payload)?,
            }),
            WALLET_UPDATE => Some(LiveEvent::WalletUpdate {
                balance: payload.get("balance").and_then(Value::as_f64),
                currency: payload
                    .get("currency")
                    .and_then(Value::as_str)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            }),
            TRANSACTION_UPDATE => Some(LiveEvent::TransactionUpdate(payload)),
            _ => None,
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            LiveEvent::MatchUpdate { .. } => MATCH_UPDATE,
            LiveEvent::OddsUpdate { .. } => ODDS_UPDATE,
            LiveEvent::MatchStarted(_) => MATCH_STARTED,
            LiveEvent::MatchEnded { .. } => MATCH_ENDED,
            LiveEvent::WalletUpdate { .. } => WALLET_UPDATE,
            LiveEvent::TransactionUpdate(_) => TRANSACTION_UPDATE,
        }
    }

    pub fn is_wallet_event(&self) -> bool {
        matches!(
            self,
            LiveEvent::WalletUpdate { .. } | LiveEvent::TransactionUpdate(_)
        )
    }
}

fn match_id_of(payload: &Value) -> Option<String> {
    payload
        .get("_id")
        .or_else(|| payload.get("id"))
        .or_else(|| payload.get("matchId"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
