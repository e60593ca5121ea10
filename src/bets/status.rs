use std::fmt;

use crate::api::models::{BetRecord, BetSelectionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    Void,
}

impl BetStatus {
    /// Case-insensitive; anything outside the four known values is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(BetStatus::Pending),
            "won" => Some(BetStatus::Won),
            "lost" => Some(BetStatus::Lost),
            "void" => Some(BetStatus::Void),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Won => "won",
            BetStatus::Lost => "lost",
            BetStatus::Void => "void",
        }
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status implied by the legs alone; `None` when no leg carries a result.
pub fn derive_from_selections(selections: &[BetSelectionRecord]) -> Option<BetStatus> {
    let results: Vec<String> = selections
        .iter()
        .filter_map(|s| s.result.as_deref())
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty())
        .collect();

    if results.is_empty() {
        return None;
    }
    if results.iter().any(|r| r == "lost") {
        return Some(BetStatus::Lost);
    }
    if results.iter().all(|r| r == "void") {
        return Some(BetStatus::Void);
    }
    if results.iter().all(|r| r == "won" || r == "void") {
        return Some(BetStatus::Won);
    }
    Some(BetStatus::Pending)
}

/// Display status of a bet.
///
/// An explicit `status` wins, then `result`, then the legs. A top-level
/// `pending` that lags behind fully settled legs yields to the derived value.
pub fn bet_status(bet: &BetRecord) -> BetStatus {
    let derived = derive_from_selections(&bet.selections);
    let settled_derived = derived.filter(|d| *d != BetStatus::Pending);

    for field in [bet.status.as_deref(), bet.result.as_deref()] {
        if let Some(explicit) = field.and_then(BetStatus::parse) {
            return match (explicit, settled_derived) {
                (BetStatus::Pending, Some(d)) => d,
                _ => explicit,
            };
        }
    }
    derived.unwrap_or(BetStatus::Pending)
}
