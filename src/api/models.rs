use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A match exactly as the backend sent it.
///
/// The backend uses two odds layouts (`markets.{h2h,totals,spreads}` or a
/// flat `odds[]` array) and two score layouts, so the record stays JSON and
/// only `crate::normalize` interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchRecord(Value);

impl MatchRecord {
    pub fn new(raw: Value) -> Self {
        MatchRecord(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// Backend id (`_id`, or `id` on some endpoints).
    pub fn id(&self) -> Option<&str> {
        self.0
            .get("_id")
            .and_then(Value::as_str)
            .or_else(|| self.0.get("id").and_then(Value::as_str))
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Shallow merge: every top-level field of `patch` overwrites ours.
    pub fn merge(&mut self, patch: &Value) {
        let Some(patch) = patch.as_object() else {
            return;
        };
        let target = ensure_object(&mut self.0);
        for (k, v) in patch {
            target.insert(k.clone(), v.clone());
        }
    }

    /// Replace `markets.h2h`, keeping the other market kinds untouched.
    pub fn set_h2h(&mut self, odds: Value) {
        let target = ensure_object(&mut self.0);
        let markets = target
            .entry("markets")
            .or_insert_with(|| Value::Object(Map::new()));
        ensure_object(markets).insert("h2h".to_string(), odds);
    }
}

fn ensure_object(v: &mut Value) -> &mut Map<String, Value> {
    if !v.is_object() {
        *v = Value::Object(Map::new());
    }
    match v {
        Value::Object(m) => m,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// One leg of a placed bet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BetSelectionRecord {
    pub result: Option<String>,
    pub selection_label: Option<String>,
    pub odds: Option<f64>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
}

/// A bet from the history endpoint. Top-level `status` and `result` are not
/// always kept in sync with the legs; see `crate::bets::status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BetRecord {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub stake: Option<f64>,
    pub selections: Vec<BetSelectionRecord>,
    pub status: Option<String>,
    pub result: Option<String>,
    pub total_odds: Option<f64>,
    pub potential_winnings: Option<f64>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub status: Option<String>,
    pub provider: Option<String>,
    pub note: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sport {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct League {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Bank {
    pub name: String,
    pub sort_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    #[serde(default)]
    pub balance: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

pub fn default_currency() -> String {
    "GHS".to_string()
}

/// Pull a match list out of whichever envelope the endpoint used.
pub fn extract_matches(response: &Value) -> Vec<MatchRecord> {
    let to_records =
        |items: &Vec<Value>| items.iter().cloned().map(MatchRecord::new).collect::<Vec<_>>();

    if let Some(items) = response.as_array() {
        return to_records(items);
    }
    if let Some(items) = response.get("matches").and_then(Value::as_array) {
        return to_records(items);
    }
    let Some(data) = response.get("data") else {
        return vec![];
    };
    if let Some(items) = data.as_array() {
        return to_records(items);
    }
    if let Some(items) = data.get("matches").and_then(Value::as_array) {
        return to_records(items);
    }
    if let Some(obj) = data.as_object() {
        let looks_like_matches = !obj.is_empty()
            && obj
                .values()
                .all(|v| v.get("homeTeam").is_some() || v.get("matchTime").is_some());
        if looks_like_matches {
            return obj.values().cloned().map(MatchRecord::new).collect();
        }
    }
    vec![]
}

/// Unwrap `{success, data: [...]}` (or a bare array) into typed items.
/// Items that fail to decode are skipped.
pub fn extract_list<T: for<'de> Deserialize<'de>>(response: &Value) -> Vec<T> {
    let items = response
        .as_array()
        .or_else(|| response.get("data").and_then(Value::as_array))
        .or_else(|| {
            response
                .get("data")
                .and_then(|d| d.get("items"))
                .and_then(Value::as_array)
        });
    items
        .map(|items| {
            items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// `data` of a `{success, data}` envelope, or the body itself.
pub fn unwrap_data(response: Value) -> Value {
    match response {
        Value::Object(mut obj) if obj.contains_key("data") => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
