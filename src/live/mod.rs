pub mod events;
pub mod socket;
pub mod watch;

pub use events::LiveEvent;
pub use socket::{ReconnectPolicy, RealtimeHub};
pub use watch::{watch_live, ViewGuard};

use tracing::debug;

use crate::api::models::MatchRecord;

/// In-memory match list patched by push events and replaced by polls.
///
/// Every mutation is keyed by match id and idempotent, so an event racing a
/// full refresh leaves the list consistent.
#[derive(Debug, Clone, Default)]
pub struct MatchList {
    matches: Vec<MatchRecord>,
}

impl MatchList {
    pub fn new(matches: Vec<MatchRecord>) -> Self {
        MatchList { matches }
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn get(&self, match_id: &str) -> Option<&MatchRecord> {
        self.matches.iter().find(|m| m.id() == Some(match_id))
    }

    fn get_mut(&mut self, match_id: &str) -> Option<&mut MatchRecord> {
        self.matches.iter_mut().find(|m| m.id() == Some(match_id))
    }

    pub fn replace_all(&mut self, matches: Vec<MatchRecord>) {
        self.matches = matches;
    }

    /// Apply a push event; returns whether the list changed.
    pub fn apply(&mut self, event: &LiveEvent) -> bool {
        match event {
            LiveEvent::MatchUpdate { match_id, patch } => match self.get_mut(match_id) {
                Some(m) => {
                    m.merge(patch);
                    true
                }
                None => false,
            },
            LiveEvent::OddsUpdate { match_id, odds } => match self.get_mut(match_id) {
                Some(m) => {
                    m.set_h2h(odds.clone());
                    true
                }
                None => false,
            },
            LiveEvent::MatchStarted(record) => {
                let Some(id) = record.id() else {
                    return false;
                };
                if self.get(id).is_some() {
                    debug!("Match {} already listed, ignoring start", id);
                    return false;
                }
                self.matches.push(record.clone());
                true
            }
            LiveEvent::MatchEnded { match_id } => {
                let before = self.matches.len();
                self.matches.retain(|m| m.id() != Some(match_id.as_str()));
                self.matches.len() != before
            }
            LiveEvent::WalletUpdate { .. } | LiveEvent::TransactionUpdate(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list(ids: &[&str]) -> MatchList {
        MatchList::new(
            ids.iter()
                .map(|id| MatchRecord::new(json!({"_id": id, "homeTeam": "A", "awayTeam": "B", "status": "in_play"})))
                .collect(),
        )
    }

    fn ids(list: &MatchList) -> Vec<&str> {
        list.matches().iter().filter_map(|m| m.id()).collect()
    }

    #[test]
    fn test_ended_removes_exactly_one_and_repeat_is_noop() {
        let mut l = list(&["a", "b", "c"]);
        let ended = LiveEvent::MatchEnded { match_id: "b".into() };
        assert!(l.apply(&ended));
        assert_eq!(ids(&l), vec!["a", "c"]);
        assert!(!l.apply(&ended));
        assert_eq!(ids(&l), vec!["a", "c"]);
    }

    #[test]
    fn test_started_does_not_duplicate() {
        let mut l = list(&["a"]);
        let again = LiveEvent::MatchStarted(MatchRecord::new(json!({"_id": "a", "homeTeam": "Z"})));
        assert!(!l.apply(&again));
        assert_eq!(l.len(), 1);
        assert_eq!(l.get("a").unwrap().str_field("homeTeam"), Some("A"));

        let new = LiveEvent::MatchStarted(MatchRecord::new(json!({"_id": "d"})));
        assert!(l.apply(&new));
        assert!(!l.apply(&new));
        assert_eq!(ids(&l), vec!["a", "d"]);
    }

    #[test]
    fn test_update_merges_into_existing_only() {
        let mut l = list(&["a", "b"]);
        let upd = LiveEvent::MatchUpdate {
            match_id: "b".into(),
            patch: json!({"_id": "b", "goals": {"home": 2, "away": 1}}),
        };
        assert!(l.apply(&upd));
        let b = l.get("b").unwrap();
        assert_eq!(b.raw()["goals"]["home"], 2);
        assert_eq!(b.str_field("homeTeam"), Some("A"));
        assert!(l.get("a").unwrap().raw().get("goals").is_none());

        let missing = LiveEvent::MatchUpdate {
            match_id: "zz".into(),
            patch: json!({"_id": "zz"}),
        };
        assert!(!l.apply(&missing));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn test_odds_update_patches_h2h_only() {
        let mut l = MatchList::new(vec![MatchRecord::new(json!({
            "_id": "a",
            "markets": {"h2h": [{"label": "Home", "odd": 1.5}], "totals": [{"point": 2.5}]}
        }))]);
        let ev = LiveEvent::OddsUpdate {
            match_id: "a".into(),
            odds: json!([{"label": "Home", "odd": 1.7}]),
        };
        assert!(l.apply(&ev));
        let a = l.get("a").unwrap();
        assert_eq!(a.raw()["markets"]["h2h"][0]["odd"], 1.7);
        assert_eq!(a.raw()["markets"]["totals"][0]["point"], 2.5);
    }

    #[test]
    fn test_wallet_events_ignored() {
        let mut l = list(&["a"]);
        assert!(!l.apply(&LiveEvent::WalletUpdate {
            balance: Some(1.0),
            currency: None
        }));
        assert!(!l.apply(&LiveEvent::TransactionUpdate(json!({}))));
    }
}
