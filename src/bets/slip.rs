//! The bet slip: selections the user is assembling before submission.
//! Session-only; nothing here is persisted.

use tracing::debug;

use crate::error::ValidationError;
use crate::normalize::{MatchView, OddsSelection};

/// A selection on the slip.
#[derive(Debug, Clone, PartialEq)]
pub struct BetSlipItem {
    /// `{matchId}_{selectionId}`; unique per (match, market, selection).
    pub id: String,
    pub match_id: String,
    /// Backend odd id sent with the bet.
    pub odd_id: String,
    pub home_team: String,
    pub away_team: String,
    pub league: Option<String>,
    /// Display name of the pick.
    pub selection: String,
    pub selection_label: String,
    pub market_type: String,
    pub odds: f64,
    /// Raw user input, single mode only.
    pub stake: Option<String>,
}

impl BetSlipItem {
    pub fn slip_id(match_id: &str, selection_id: &str) -> String {
        format!("{}_{}", match_id, selection_id)
    }

    /// Build an item from a tapped price. Locked selections (no price) cannot
    /// be added.
    pub fn from_selection(
        view: &MatchView,
        selection: &OddsSelection,
        market_type: &str,
    ) -> Option<Self> {
        let odds = selection.price?;
        Some(BetSlipItem {
            id: Self::slip_id(&view.id, &selection.id),
            match_id: view.id.clone(),
            odd_id: selection.odd_id().to_string(),
            home_team: view.home_team.clone(),
            away_team: view.away_team.clone(),
            league: view.league.clone(),
            selection: selection.name.clone(),
            selection_label: if selection.selection_label.is_empty() {
                selection.name.clone()
            } else {
                selection.selection_label.clone()
            },
            market_type: market_type.to_string(),
            odds,
            stake: None,
        })
    }

    fn parsed_stake(&self) -> f64 {
        self.stake.as_deref().and_then(parse_amount).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BetType {
    #[default]
    Single,
    Multiple,
}

#[derive(Debug, Clone, Default)]
pub struct BetSlip {
    items: Vec<BetSlipItem>,
    bet_type: BetType,
    /// Shared stake; the only stake in multiple mode, the fallback in single.
    stake: String,
}

impl BetSlip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[BetSlipItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn bet_type(&self) -> BetType {
        self.bet_type
    }

    pub fn stake(&self) -> &str {
        &self.stake
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|b| b.id == id)
    }

    /// No-op when an item with the same id is already on the slip.
    pub fn add(&mut self, item: BetSlipItem) {
        if self.contains(&item.id) {
            return;
        }
        debug!("Bet slip: added {} ({})", item.id, item.selection);
        self.items.push(item);
    }

    pub fn remove(&mut self, id: &str) {
        self.items.retain(|b| b.id != id);
        if self.items.len() < 2 {
            self.bet_type = BetType::Single;
        }
    }

    /// Re-tapping the same price removes it. Returns whether the item is on
    /// the slip afterwards.
    pub fn toggle(&mut self, item: BetSlipItem) -> bool {
        if self.contains(&item.id) {
            self.remove(&item.id);
            false
        } else {
            self.add(item);
            true
        }
    }

    /// Empties the slip and resets the shared stake.
    pub fn clear(&mut self) {
        self.items.clear();
        self.stake.clear();
        self.bet_type = BetType::Single;
    }

    /// Store the raw text so half-typed input survives.
    pub fn update_stake(&mut self, id: &str, value: &str) {
        if let Some(item) = self.items.iter_mut().find(|b| b.id == id) {
            item.stake = Some(value.to_string());
        }
    }

    pub fn set_stake(&mut self, value: &str) {
        self.stake = value.to_string();
    }

    /// Single mode: every item without a positive stake of its own takes the
    /// shared stake, so the totals show what `plan_submission` will send.
    pub fn apply_shared_stake(&mut self) {
        if self.bet_type != BetType::Single || !is_positive(&self.stake) {
            return;
        }
        for item in &mut self.items {
            if !item.stake.as_deref().is_some_and(is_positive) {
                item.stake = Some(self.stake.clone());
            }
        }
    }

    pub fn set_bet_type(&mut self, bet_type: BetType) -> Result<(), ValidationError> {
        if bet_type == BetType::Multiple && self.items.len() < 2 {
            return Err(ValidationError::NotEnoughSelections);
        }
        self.bet_type = bet_type;
        Ok(())
    }

    /// Single: sum of prices (display only). Multiple: accumulator odds.
    pub fn total_odds(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        match self.bet_type {
            BetType::Single => self.items.iter().map(|b| b.odds).sum(),
            BetType::Multiple => self.items.iter().map(|b| b.odds).product(),
        }
    }

    pub fn total_stake(&self) -> f64 {
        match self.bet_type {
            BetType::Single => self.items.iter().map(BetSlipItem::parsed_stake).sum(),
            BetType::Multiple => self.shared_stake(),
        }
    }

    pub fn potential_winnings(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        match self.bet_type {
            BetType::Single => self
                .items
                .iter()
                .map(|b| b.parsed_stake() * b.odds)
                .sum(),
            BetType::Multiple => self.shared_stake() * self.total_odds(),
        }
    }

    pub(crate) fn shared_stake(&self) -> f64 {
        parse_amount(&self.stake).unwrap_or(0.0)
    }
}

fn is_positive(value: &str) -> bool {
    parse_amount(value).is_some_and(|v| v > 0.0)
}

/// Lenient decimal parse of the leading numeric part of user input:
/// `"10"`, `" 2.5"`, `"10abc"` and `".5"` parse; `""` and `"abc"` do not.
pub fn parse_amount(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn item(id: &str, odds: f64, stake: Option<&str>) -> BetSlipItem {
        BetSlipItem {
            id: id.to_string(),
            match_id: "m1".into(),
            odd_id: format!("odd_{}", id),
            home_team: "A".into(),
            away_team: "B".into(),
            league: None,
            selection: "A".into(),
            selection_label: "Home".into(),
            market_type: "h2h".into(),
            odds,
            stake: stake.map(str::to_string),
        }
    }

    #[test]
    fn test_shared_stake_fills_unstaked_singles() {
        let mut slip = BetSlip::new();
        slip.add(item("a", 2.0, Some("5")));
        slip.add(item("b", 3.0, Some("0")));
        slip.add(item("c", 4.0, None));
        slip.set_stake("10");
        slip.apply_shared_stake();
        assert_eq!(slip.items()[0].stake.as_deref(), Some("5"));
        assert_eq!(slip.items()[1].stake.as_deref(), Some("10"));
        assert_eq!(slip.items()[2].stake.as_deref(), Some("10"));
        assert_relative_eq!(slip.total_stake(), 25.0);

        let mut blank = BetSlip::new();
        blank.add(item("a", 2.0, None));
        blank.apply_shared_stake();
        assert_eq!(blank.items()[0].stake, None);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut slip = BetSlip::new();
        slip.add(item("x", 2.0, None));
        slip.add(item("x", 9.0, None));
        assert_eq!(slip.len(), 1);
        assert_relative_eq!(slip.items()[0].odds, 2.0);
    }

    #[test]
    fn test_toggle_twice_is_identity() {
        let mut slip = BetSlip::new();
        slip.add(item("a", 1.5, None));
        let before = slip.items().to_vec();

        assert!(slip.toggle(item("b", 2.0, None)));
        assert!(!slip.toggle(item("b", 2.0, None)));
        assert_eq!(slip.items(), before.as_slice());
    }

    #[test]
    fn test_insertion_order_kept() {
        let mut slip = BetSlip::new();
        for id in ["c", "a", "b"] {
            slip.add(item(id, 2.0, None));
        }
        let ids: Vec<&str> = slip.items().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        slip.remove("a");
        let ids: Vec<&str> = slip.items().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_multiple_winnings() {
        let mut slip = BetSlip::new();
        slip.add(item("a", 2.0, None));
        slip.add(item("b", 1.5, None));
        slip.set_bet_type(BetType::Multiple).unwrap();
        slip.set_stake("10");
        assert_relative_eq!(slip.total_odds(), 3.0);
        assert_relative_eq!(slip.total_stake(), 10.0);
        assert_relative_eq!(slip.potential_winnings(), 30.0);
    }

    #[test]
    fn test_single_winnings() {
        let mut slip = BetSlip::new();
        slip.add(item("a", 2.0, Some("10")));
        slip.add(item("b", 3.0, Some("5")));
        assert_relative_eq!(slip.potential_winnings(), 35.0);
        assert_relative_eq!(slip.total_stake(), 15.0);
        assert_relative_eq!(slip.total_odds(), 5.0);
    }

    #[test]
    fn test_bad_stake_counts_as_zero() {
        let mut slip = BetSlip::new();
        slip.add(item("a", 2.0, Some("abc")));
        slip.add(item("b", 3.0, Some("")));
        slip.add(item("c", 4.0, None));
        slip.update_stake("c", "1.");
        assert_eq!(slip.items()[2].stake.as_deref(), Some("1."));
        assert_relative_eq!(slip.total_stake(), 1.0);
        assert_relative_eq!(slip.potential_winnings(), 4.0);
    }

    #[test]
    fn test_multiple_needs_two_selections() {
        let mut slip = BetSlip::new();
        assert_eq!(
            slip.set_bet_type(BetType::Multiple),
            Err(ValidationError::NotEnoughSelections)
        );
        slip.add(item("a", 2.0, None));
        assert!(slip.set_bet_type(BetType::Multiple).is_err());
        slip.add(item("b", 2.0, None));
        assert!(slip.set_bet_type(BetType::Multiple).is_ok());

        slip.remove("b");
        assert_eq!(slip.bet_type(), BetType::Single);
    }

    #[test]
    fn test_clear_resets_shared_stake() {
        let mut slip = BetSlip::new();
        slip.add(item("a", 2.0, None));
        slip.set_stake("25");
        slip.clear();
        assert!(slip.is_empty());
        assert_eq!(slip.stake(), "");
        assert_relative_eq!(slip.total_odds(), 0.0);
        assert_relative_eq!(slip.potential_winnings(), 0.0);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("10"), Some(10.0));
        assert_eq!(parse_amount(" 2.5 "), Some(2.5));
        assert_eq!(parse_amount("10abc"), Some(10.0));
        assert_eq!(parse_amount(".5"), Some(0.5));
        assert_eq!(parse_amount("3."), Some(3.0));
        assert_eq!(parse_amount("-4"), Some(-4.0));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("."), None);
    }
}
