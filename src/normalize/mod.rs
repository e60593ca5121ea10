//! Turns raw backend match records into the one view model every renderer
//! consumes. All knowledge of the backend's alternative field layouts lives
//! here and in `odds`.

pub mod odds;

pub use odds::{count_markets, h2h_odds, market_groups, H2hOdds, MarketGroup, OddsSelection};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::models::MatchRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Scheduled,
    InPlay,
    Finished,
    Postponed,
    Cancelled,
}

impl MatchStatus {
    /// Unknown or missing statuses read as scheduled.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("in_play") => MatchStatus::InPlay,
            Some("finished") => MatchStatus::Finished,
            Some("postponed") => MatchStatus::Postponed,
            Some("cancelled") => MatchStatus::Cancelled,
            _ => MatchStatus::Scheduled,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchStatus::InPlay => "LIVE",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::Postponed => "POSTPONED",
            MatchStatus::Cancelled => "CANCELLED",
            MatchStatus::Scheduled => "SCHEDULED",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            MatchStatus::InPlay => "#4CAF50",
            MatchStatus::Finished => "#9E9E9E",
            MatchStatus::Postponed | MatchStatus::Cancelled => "#F44336",
            MatchStatus::Scheduled => "#FFA726",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub home: i64,
    pub away: i64,
}

/// Current score, or `None` before kickoff / when the backend sent none.
/// `goals.{home,away}` takes priority over `homeScore`/`awayScore`.
pub fn score(record: &MatchRecord) -> Option<Score> {
    if record.str_field("status") == Some("scheduled") {
        return None;
    }
    let raw = record.raw();
    let side = |goals_key: &str, flat_key: &str| {
        int_of(&raw["goals"][goals_key]).or_else(|| int_of(&raw[flat_key]))
    };
    let home = side("home", "homeScore");
    let away = side("away", "awayScore");
    if home.is_none() && away.is_none() {
        return None;
    }
    Some(Score {
        home: home.unwrap_or(0),
        away: away.unwrap_or(0),
    })
}

fn int_of(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_f64().map(|f| f as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// What to draw for a team badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Logo {
    Url(String),
    Initials(String),
}

/// Use `url` only when it looks loadable (`http…`, `/…`, `data:`), else fall
/// back to the team's initials.
pub fn team_logo(url: Option<&str>, team: &str) -> Logo {
    match url.map(str::trim) {
        Some(u) if u.starts_with("http") || u.starts_with('/') || u.starts_with("data:") => {
            Logo::Url(u.to_string())
        }
        _ => Logo::Initials(initials(team)),
    }
}

fn initials(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .take(2)
        .collect::<String>()
        .to_uppercase();
    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}

/// Canonical, render-ready view of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchView {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub league: Option<String>,
    pub kickoff: Option<DateTime<Utc>>,
    pub status: MatchStatus,
    pub score: Option<Score>,
    pub h2h: Option<H2hOdds>,
    pub market_count: usize,
    pub home_logo: Logo,
    pub away_logo: Logo,
}

impl MatchView {
    pub fn from_record(record: &MatchRecord) -> Self {
        let raw = record.raw();
        let home_team = record.str_field("homeTeam").unwrap_or_default().to_string();
        let away_team = record.str_field("awayTeam").unwrap_or_default().to_string();
        let league = raw["league"]["title"]
            .as_str()
            .or_else(|| raw["league"].as_str())
            .map(str::to_string);
        let kickoff = record
            .str_field("matchTime")
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));

        MatchView {
            id: record.id().unwrap_or_default().to_string(),
            home_logo: team_logo(raw["homeTeamRef"]["logo"].as_str(), &home_team),
            away_logo: team_logo(raw["awayTeamRef"]["logo"].as_str(), &away_team),
            home_team,
            away_team,
            league,
            kickoff,
            status: MatchStatus::parse(record.str_field("status")),
            score: score(record),
            h2h: h2h_odds(record),
            market_count: count_markets(record),
        }
    }

    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }

    pub fn status_color(&self) -> &'static str {
        self.status.color()
    }
}
