//! Odds shape-sniffing: both backend layouts end up as `OddsSelection`s.

use serde_json::Value;

use crate::api::models::MatchRecord;

/// One tappable price on a match, with a synthetic id that is stable across
/// normalization passes.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsSelection {
    pub id: String,
    /// Backend odd document id, when the selection lives inside a market.
    pub real_odd_id: Option<String>,
    /// Display name (team name for home/away picks).
    pub name: String,
    /// Label the backend expects back when the bet is placed.
    pub selection_label: String,
    /// `None` renders as a locked placeholder.
    pub price: Option<f64>,
    pub point: Option<f64>,
}

impl OddsSelection {
    /// Id to send to `POST /bets`.
    pub fn odd_id(&self) -> &str {
        self.real_odd_id.as_deref().unwrap_or(&self.id)
    }

    pub fn is_locked(&self) -> bool {
        self.price.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct H2hOdds {
    pub home: Option<OddsSelection>,
    pub draw: Option<OddsSelection>,
    pub away: Option<OddsSelection>,
}

impl H2hOdds {
    pub fn iter(&self) -> impl Iterator<Item = Option<&OddsSelection>> {
        [self.home.as_ref(), self.draw.as_ref(), self.away.as_ref()].into_iter()
    }

    pub fn find(&self, id: &str) -> Option<&OddsSelection> {
        self.iter().flatten().find(|s| s.id == id)
    }

    fn from_selections(selections: Vec<OddsSelection>, home: &str, away: &str) -> Self {
        let by_name = |name: &str| selections.iter().find(|s| s.name == name).cloned();
        let by_label = |label: &str| {
            selections
                .iter()
                .find(|s| s.selection_label == label)
                .cloned()
        };
        // Team names only tell the sides apart when both are present and
        // distinct; otherwise use the backend's Home/Away labels.
        if home.is_empty() || away.is_empty() || home == away {
            return H2hOdds {
                home: by_label("Home"),
                draw: by_name("Draw"),
                away: by_label("Away"),
            };
        }
        H2hOdds {
            home: by_name(home),
            draw: by_name("Draw"),
            away: by_name(away),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketGroup {
    pub key: String,
    pub label: String,
    pub items: Vec<OddsSelection>,
}

impl MarketGroup {
    pub fn is_over_under(&self) -> bool {
        self.label == OVER_UNDER_MARKET
    }
}

const OVER_UNDER_MARKET: &str = "Goals Over/Under";
const MATCH_WINNER_MARKET: &str = "Match Winner";

/// Resolve the 1X2 triple, preferring `markets.h2h` over the flat `odds[]`
/// layout. `None` means there is nothing to show; the caller renders locked
/// buttons.
pub fn h2h_odds(record: &MatchRecord) -> Option<H2hOdds> {
    let raw = record.raw();
    let match_id = record.id().unwrap_or_default();
    let home = record.str_field("homeTeam").unwrap_or_default();
    let away = record.str_field("awayTeam").unwrap_or_default();

    if let Some(entries) = non_empty_array(&raw["markets"]["h2h"]) {
        let selections = h2h_selections(entries, match_id, home, away);
        return Some(H2hOdds::from_selections(selections, home, away));
    }

    let markets = non_empty_array(&raw["odds"])?;
    let winner = markets.iter().find(|m| {
        m["marketId"].as_i64() == Some(1) || m["name"].as_str() == Some(MATCH_WINNER_MARKET)
    })?;
    let picks = non_empty_array(&winner["selections"])?;
    let market_key = value_key(&winner["marketId"]).unwrap_or_else(|| "mw".to_string());
    let real_odd_id = str_of(&winner["_id"]);

    let selections = picks
        .iter()
        .map(|sel| {
            let label = str_of(&sel["label"]).unwrap_or_default();
            let name = match label.as_str() {
                "Home" => home.to_string(),
                "Away" => away.to_string(),
                _ => "Draw".to_string(),
            };
            OddsSelection {
                id: str_of(&sel["_id"])
                    .unwrap_or_else(|| format!("{}_{}_{}", match_id, market_key, label)),
                real_odd_id: real_odd_id.clone(),
                name,
                selection_label: label,
                price: price_of(sel),
                point: None,
            }
        })
        .collect();
    Some(H2hOdds::from_selections(selections, home, away))
}

fn h2h_selections(entries: &[Value], match_id: &str, home: &str, away: &str) -> Vec<OddsSelection> {
    entries
        .iter()
        .enumerate()
        .map(|(index, odd)| {
            let raw_label = str_of(&odd["label"]).or_else(|| str_of(&odd["name"]));
            let name = match raw_label.as_deref() {
                Some("Home") => home.to_string(),
                Some("Away") => away.to_string(),
                Some("Draw") | Some("X") => "Draw".to_string(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            let fallback_key = raw_label
                .clone()
                .filter(|l| !l.is_empty())
                .or_else(|| Some(name.clone()).filter(|n| !n.is_empty()))
                .unwrap_or_else(|| index.to_string());
            OddsSelection {
                id: str_of(&odd["_id"])
                    .unwrap_or_else(|| format!("{}_h2h_{}", match_id, fallback_key)),
                real_odd_id: None,
                selection_label: str_of(&odd["selectionLabel"])
                    .or(raw_label)
                    .unwrap_or_else(|| name.clone()),
                name,
                price: price_of(odd),
                point: None,
            }
        })
        .collect()
}

/// Every market the detail view can show: the nested `markets` kinds first,
/// then each flat `odds[]` market. Empty groups are dropped.
pub fn market_groups(record: &MatchRecord) -> Vec<MarketGroup> {
    let raw = record.raw();
    let match_id = record.id().unwrap_or_default();
    let home = record.str_field("homeTeam").unwrap_or_default();
    let away = record.str_field("awayTeam").unwrap_or_default();
    let mut groups = Vec::new();

    if let Some(entries) = non_empty_array(&raw["markets"]["h2h"]) {
        groups.push(MarketGroup {
            key: "h2h".into(),
            label: "Match Result".into(),
            items: h2h_selections(entries, match_id, home, away),
        });
    }
    for (kind, label) in [("totals", "Totals"), ("spreads", "Spreads")] {
        if let Some(entries) = non_empty_array(&raw["markets"][kind]) {
            groups.push(MarketGroup {
                key: kind.into(),
                label: label.into(),
                items: line_selections(entries, match_id, kind),
            });
        }
    }

    if let Some(markets) = non_empty_array(&raw["odds"]) {
        for market in markets {
            groups.push(flat_market_group(market, match_id, home, away));
        }
    }

    groups.retain(|g| !g.items.is_empty());
    groups
}

fn line_selections(entries: &[Value], match_id: &str, kind: &str) -> Vec<OddsSelection> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let label = str_of(&entry["label"])
                .or_else(|| str_of(&entry["name"]))
                .unwrap_or_else(|| format!("Option {}", index + 1));
            let point = num_of(&entry["point"]);
            let suffix = point.map(fmt_point).unwrap_or_else(|| index.to_string());
            OddsSelection {
                id: str_of(&entry["_id"])
                    .unwrap_or_else(|| format!("{}_{}_{}_{}", match_id, kind, label, suffix)),
                real_odd_id: None,
                name: label.clone(),
                selection_label: str_of(&entry["selectionLabel"]).unwrap_or(label),
                price: price_of(entry),
                point,
            }
        })
        .collect()
}

fn flat_market_group(market: &Value, match_id: &str, home: &str, away: &str) -> MarketGroup {
    let market_key = value_key(&market["marketId"])
        .or_else(|| str_of(&market["_id"]))
        .or_else(|| str_of(&market["name"]))
        .unwrap_or_default();
    let label = str_of(&market["name"]).unwrap_or_else(|| market_key.clone());
    let real_odd_id = str_of(&market["_id"]);
    let build_id = |key: &str| format!("{}_{}_{}", match_id, market_key, key);
    let selections: &[Value] = market["selections"].as_array().map(Vec::as_slice).unwrap_or(&[]);
    let grouped = market["type"].as_str() == Some("grouped");

    let mut items = Vec::new();
    if grouped && label == OVER_UNDER_MARKET {
        for sel in selections {
            let point = num_of(&sel["point"]);
            let point_text = point.map(fmt_point).unwrap_or_default();
            for (side, title) in [("over", "Over"), ("under", "Under")] {
                let leg = &sel[side];
                if !leg.is_object() {
                    continue;
                }
                let name = str_of(&leg["label"])
                    .unwrap_or_else(|| format!("{} {}", title, point_text));
                items.push(OddsSelection {
                    id: build_id(&format!("{}_{}", side, point_text)),
                    real_odd_id: real_odd_id.clone(),
                    selection_label: name.clone(),
                    name,
                    price: price_of(leg),
                    point,
                });
            }
        }
    } else {
        for (index, sel) in selections.iter().enumerate() {
            let label = str_of(&sel["label"]);
            let name = match label.as_deref() {
                Some("Home") if !grouped => home.to_string(),
                Some("Away") if !grouped => away.to_string(),
                Some(l) => l.to_string(),
                None => format!("Option {}", index + 1),
            };
            items.push(OddsSelection {
                id: build_id(&format!("{}_{}", label.as_deref().unwrap_or("pick"), index)),
                real_odd_id: real_odd_id.clone(),
                selection_label: label.unwrap_or_else(|| name.clone()),
                name,
                price: price_of(sel),
                point: if grouped { num_of(&sel["point"]) } else { None },
            });
        }
    }

    MarketGroup {
        key: format!("odds_{}", market_key),
        label,
        items,
    }
}

/// Number of markets advertised on a match card.
pub fn count_markets(record: &MatchRecord) -> usize {
    let raw = record.raw();
    let len = |v: &Value| v.as_array().map(Vec::len).unwrap_or(0);
    len(&raw["markets"]["h2h"])
        + len(&raw["markets"]["totals"])
        + len(&raw["markets"]["spreads"])
        + len(&raw["odds"])
}

fn non_empty_array(v: &Value) -> Option<&[Value]> {
    v.as_array().filter(|a| !a.is_empty()).map(Vec::as_slice)
}

fn str_of(v: &Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

fn num_of(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// `price`, falling back to `odd`. Zero and non-numeric prices count as
/// missing.
fn price_of(v: &Value) -> Option<f64> {
    num_of(&v["price"])
        .filter(|p| *p > 0.0)
        .or_else(|| num_of(&v["odd"]).filter(|p| *p > 0.0))
}

/// Ids may be numbers or strings.
fn value_key(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn fmt_point(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("{}", p as i64)
    } else {
        format!("{}", p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn record(v: Value) -> MatchRecord {
        MatchRecord::new(v)
    }

    #[test]
    fn test_h2h_from_markets_keyed_by_team() {
        // Array order deliberately scrambled.
        let m = record(json!({
            "_id": "m1", "homeTeam": "Hearts", "awayTeam": "Kotoko",
            "markets": {"h2h": [
                {"label": "Away", "odd": 4.2},
                {"label": "Home", "odd": 1.8},
                {"label": "Draw", "odd": 3.1}
            ]}
        }));
        let odds = h2h_odds(&m).unwrap();
        assert_relative_eq!(odds.home.as_ref().unwrap().price.unwrap(), 1.8);
        assert_relative_eq!(odds.draw.as_ref().unwrap().price.unwrap(), 3.1);
        assert_relative_eq!(odds.away.as_ref().unwrap().price.unwrap(), 4.2);
        assert_eq!(odds.home.as_ref().unwrap().id, "m1_h2h_Home");
        assert_eq!(odds.home.as_ref().unwrap().name, "Hearts");
        assert_eq!(odds.home.as_ref().unwrap().selection_label, "Home");
    }

    #[test]
    fn test_h2h_sides_stay_apart_without_team_names() {
        let m = record(json!({
            "_id": "m1",
            "markets": {"h2h": [
                {"label": "Home", "odd": 1.5},
                {"label": "Draw", "odd": 3.0},
                {"label": "Away", "odd": 4.0}
            ]}
        }));
        let odds = h2h_odds(&m).unwrap();
        assert_relative_eq!(odds.home.as_ref().unwrap().price.unwrap(), 1.5);
        assert_relative_eq!(odds.away.as_ref().unwrap().price.unwrap(), 4.0);
        assert_ne!(odds.home, odds.away);

        let same = record(json!({
            "_id": "m2", "homeTeam": "Reserves", "awayTeam": "Reserves",
            "odds": [{"_id": "mk1", "marketId": 1, "name": "Match Winner", "selections": [
                {"label": "Home", "odd": 2.1},
                {"label": "Away", "odd": 2.9}
            ]}]
        }));
        let odds = h2h_odds(&same).unwrap();
        assert_eq!(odds.home.as_ref().unwrap().selection_label, "Home");
        assert_eq!(odds.away.as_ref().unwrap().selection_label, "Away");
        assert!(odds.draw.is_none());
    }

    #[test]
    fn test_h2h_x_label_and_existing_ids() {
        let m = record(json!({
            "_id": "m1", "homeTeam": "A", "awayTeam": "B",
            "markets": {"h2h": [
                {"_id": "o1", "name": "Home", "price": 2.0},
                {"_id": "o2", "name": "X", "price": 3.0},
                {"_id": "o3", "name": "Away", "price": 3.5}
            ]}
        }));
        let odds = h2h_odds(&m).unwrap();
        assert_eq!(odds.draw.as_ref().unwrap().id, "o2");
        assert_eq!(odds.draw.as_ref().unwrap().name, "Draw");
        assert_eq!(odds.find("o3").unwrap().name, "B");
    }

    #[test]
    fn test_h2h_from_legacy_match_winner_market() {
        let m = record(json!({
            "_id": "m9", "homeTeam": "A", "awayTeam": "B",
            "odds": [
                {"_id": "mk2", "marketId": 5, "name": "Goals Over/Under", "selections": []},
                {"_id": "mk1", "marketId": 1, "name": "Match Winner", "selections": [
                    {"label": "Home", "odd": 1.9},
                    {"label": "Draw", "odd": 3.2},
                    {"label": "Away", "odd": "3.8"}
                ]}
            ]
        }));
        let odds = h2h_odds(&m).unwrap();
        let home = odds.home.unwrap();
        assert_eq!(home.id, "m9_1_Home");
        assert_eq!(home.odd_id(), "mk1");
        assert_relative_eq!(odds.away.unwrap().price.unwrap(), 3.8);
    }

    #[test]
    fn test_h2h_absent_is_none() {
        assert!(h2h_odds(&record(json!({"_id": "m1", "homeTeam": "A"}))).is_none());
        let no_winner = record(json!({
            "_id": "m1", "odds": [{"marketId": 7, "name": "Both Teams Score", "selections": []}]
        }));
        assert!(h2h_odds(&no_winner).is_none());
    }

    #[test]
    fn test_missing_price_is_locked_not_error() {
        let m = record(json!({
            "_id": "m1", "homeTeam": "A", "awayTeam": "B",
            "markets": {"h2h": [{"label": "Home"}, {"label": "Away", "odd": 0}]}
        }));
        let odds = h2h_odds(&m).unwrap();
        assert!(odds.home.unwrap().is_locked());
        assert!(odds.away.unwrap().is_locked());
        assert!(odds.draw.is_none());
    }

    #[test]
    fn test_over_under_expands_per_point() {
        let m = record(json!({
            "_id": "m1", "homeTeam": "A", "awayTeam": "B",
            "odds": [{
                "_id": "mk5", "marketId": 5, "type": "grouped", "name": "Goals Over/Under",
                "selections": [
                    {"point": 1.5, "over": {"odd": 1.3}, "under": {"odd": 3.2}},
                    {"point": 2.5, "over": {"label": "Over 2.5 goals", "price": 1.9}}
                ]
            }]
        }));
        let groups = market_groups(&m);
        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert!(g.is_over_under());
        assert_eq!(g.key, "odds_5");
        let ids: Vec<&str> = g.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["m1_5_over_1.5", "m1_5_under_1.5", "m1_5_over_2.5"]);
        assert_eq!(g.items[1].name, "Under 1.5");
        assert_eq!(g.items[2].name, "Over 2.5 goals");
        assert_eq!(g.items[0].odd_id(), "mk5");
    }

    #[test]
    fn test_other_markets_expand_per_selection() {
        let m = record(json!({
            "_id": "m1", "homeTeam": "A", "awayTeam": "B",
            "odds": [
                {"_id": "mk1", "marketId": 1, "name": "Match Winner", "selections": [
                    {"label": "Home", "odd": 1.9}, {"label": "Away", "odd": 2.1}
                ]},
                {"_id": "mk8", "type": "grouped", "name": "Correct Score", "selections": [
                    {"label": "1-0", "odd": 6.0}, {"odd": 9.0}
                ]},
                {"_id": "mk9", "name": "Empty", "selections": []}
            ]
        }));
        let groups = market_groups(&m);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].items[0].name, "A");
        assert_eq!(groups[0].items[0].id, "m1_1_Home_0");
        assert_eq!(groups[1].key, "odds_mk8");
        assert_eq!(groups[1].items[1].id, "m1_mk8_pick_1");
        assert_eq!(groups[1].items[1].name, "Option 2");
    }

    #[test]
    fn test_nested_markets_enumerated_with_flat_ones() {
        let m = record(json!({
            "_id": "m1", "homeTeam": "A", "awayTeam": "B",
            "markets": {
                "h2h": [{"label": "Home", "odd": 2.0}],
                "totals": [{"name": "Over", "point": 2.5, "price": 1.8}, {"name": "Under", "point": 2.5, "price": 2.0}]
            },
            "odds": [{"_id": "mk3", "name": "Double Chance", "selections": [{"label": "1X", "odd": 1.2}]}]
        }));
        let groups = market_groups(&m);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["h2h", "totals", "odds_mk3"]);
        assert_eq!(groups[1].items[0].id, "m1_totals_Over_2.5");
        assert_eq!(count_markets(&m), 4);
    }

    #[test]
    fn test_ids_stable_across_passes() {
        let m = record(json!({
            "_id": "m1", "homeTeam": "A", "awayTeam": "B",
            "markets": {"h2h": [{"label": "Home", "odd": 2.0}]}
        }));
        assert_eq!(market_groups(&m), market_groups(&m.clone()));
    }
}
