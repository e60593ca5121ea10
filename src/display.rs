//! Plain-text rendering for the terminal. Everything returns a `String` so the
//! caller decides where it goes (stdout); diagnostics go through `tracing`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use owo_colors::OwoColorize;
use std::fmt::{self, Write};

use crate::api::models::{BetRecord, TransactionRecord};
use crate::bets::{bet_status, BetSlip, BetStats, BetType};
use crate::normalize::{Logo, MarketGroup, MatchStatus, MatchView, OddsSelection};
use crate::wallet::payments::{is_credit, transaction_label};

/// `Today, HH:MM`, `Tomorrow, HH:MM`, else `DD/MM, HH:MM`, in `now`'s zone.
pub fn format_match_time<Tz: TimeZone>(kickoff: &DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    let local = kickoff.with_timezone(&now.timezone());
    let today = now.date_naive();
    let day = local.date_naive();
    let clock = local.format("%H:%M");
    if day == today {
        format!("Today, {}", clock)
    } else if Some(day) == today.checked_add_signed(Duration::days(1)) {
        format!("Tomorrow, {}", clock)
    } else {
        format!("{}, {}", local.format("%d/%m"), clock)
    }
}

pub fn format_money(amount: f64, currency: &str) -> String {
    if currency.eq_ignore_ascii_case("GHS") {
        format!("GH₵{:.2}", amount)
    } else {
        format!("{} {:.2}", currency, amount)
    }
}

/// Wrap `text` in the 24-bit colour `hex` (`#RRGGBB`). Plain when colour is
/// off or the hex does not parse.
pub fn paint(text: &str, hex: &str, color: bool) -> String {
    match hex_rgb(hex) {
        Some((r, g, b)) if color => text.truecolor(r, g, b).to_string(),
        _ => text.to_string(),
    }
}

fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let h = hex.strip_prefix('#').filter(|h| h.len() == 6)?;
    let channel = |i: usize| u8::from_str_radix(h.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

pub fn format_odds(selection: Option<&OddsSelection>) -> String {
    match selection {
        Some(s) if !s.is_locked() => format!("{:.2}", s.price.unwrap_or_default()),
        _ => "🔒".to_string(),
    }
}

fn selection_cell(label: &str, sel: Option<&OddsSelection>) -> String {
    format!("{} {}", label, format_odds(sel))
}

fn logo_text(logo: &Logo) -> String {
    match logo {
        Logo::Url(url) => url.clone(),
        Logo::Initials(initials) => format!("[{}]", initials),
    }
}

/// One line per match: status, teams/score, league, kickoff, 1X2 prices.
pub fn match_row<Tz: TimeZone>(view: &MatchView, now: &DateTime<Tz>, color: bool) -> String
where
    Tz::Offset: fmt::Display,
{
    let status = match view.status {
        MatchStatus::InPlay => "● LIVE".to_string(),
        _ => view.status_label().to_string(),
    };
    let status = paint(&format!("{:<10}", status), view.status_color(), color);
    let teams = match view.score {
        Some(s) => format!("{} {} - {} {}", view.home_team, s.home, s.away, view.away_team),
        None => format!("{} vs {}", view.home_team, view.away_team),
    };
    let when = view
        .kickoff
        .map(|k| format_match_time(&k, now))
        .unwrap_or_else(|| "TBD".to_string());

    let h2h = view.h2h.clone().unwrap_or_default();
    let mut line = format!(
        "{} {:<40} {:<16} | {} | {} {} {}",
        status,
        teams,
        when,
        view.league.as_deref().unwrap_or("-"),
        selection_cell("1", h2h.home.as_ref()),
        selection_cell("X", h2h.draw.as_ref()),
        selection_cell("2", h2h.away.as_ref()),
    );
    if view.market_count > 1 {
        let _ = write!(line, " | +{} markets", view.market_count - 1);
    }
    let _ = write!(line, "  [{}]", view.id);
    line
}

/// Header for the match detail screen: both sides with their badges.
pub fn match_header(view: &MatchView) -> String {
    format!(
        "{} {} vs {} {}",
        view.home_team,
        logo_text(&view.home_logo),
        view.away_team,
        logo_text(&view.away_logo)
    )
}

/// Full market board for a match; selection ids are what `bet --pick` takes.
/// Over/under legs sharing a line are printed side by side.
pub fn market_board(groups: &[MarketGroup]) -> String {
    if groups.is_empty() {
        return "No markets available.\n".to_string();
    }
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "{}", group.label);
        if group.is_over_under() {
            over_under_lines(&mut out, &group.items);
            continue;
        }
        for item in &group.items {
            let _ = writeln!(
                out,
                "  {:<28} {:<24} {:>6}",
                item.id,
                item.name,
                format_odds(Some(item))
            );
        }
    }
    out
}

fn over_under_lines(out: &mut String, items: &[OddsSelection]) {
    let mut points: Vec<Option<f64>> = Vec::new();
    for item in items {
        if !points.contains(&item.point) {
            points.push(item.point);
        }
    }
    for point in points {
        let leg = |side: &str| {
            items
                .iter()
                .find(|s| s.point == point && s.id.contains(side))
                .map(|s| format!("{} {} [{}]", s.name, format_odds(Some(s)), s.id))
                .unwrap_or_else(|| "-".to_string())
        };
        let line = point.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string());
        let _ = writeln!(out, "  {:<6} {:<40} {}", line, leg("_over_"), leg("_under_"));
    }
}

pub fn bet_slip(slip: &BetSlip, currency: &str) -> String {
    if slip.is_empty() {
        return "Bet slip is empty.\n".to_string();
    }
    let mut out = String::new();
    let kind = match slip.bet_type() {
        BetType::Single => "Single",
        BetType::Multiple => "Multiple",
    };
    let _ = writeln!(out, "Bet slip ({}, {} selection(s))", kind, slip.len());
    for item in slip.items() {
        let stake = match (slip.bet_type(), item.stake.as_deref()) {
            (BetType::Single, Some(s)) if !s.is_empty() => format!("  stake {}", s),
            _ => String::new(),
        };
        let _ = writeln!(
            out,
            "  {} vs {}: {} @ {:.2}{}",
            item.home_team, item.away_team, item.selection, item.odds, stake
        );
    }
    let _ = writeln!(out, "Total odds:         {:.2}", slip.total_odds());
    let _ = writeln!(out, "Total stake:        {}", format_money(slip.total_stake(), currency));
    let _ = writeln!(
        out,
        "Potential winnings: {}",
        format_money(slip.potential_winnings(), currency)
    );
    out
}

pub fn bet_history(bets: &[&BetRecord], stats: &BetStats, currency: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} bet(s): {} pending, {} won, {} lost | staked {} | won {}",
        stats.total,
        stats.pending,
        stats.won,
        stats.lost,
        format_money(stats.total_staked, currency),
        format_money(stats.total_winnings, currency)
    );
    if bets.is_empty() {
        let _ = writeln!(out, "No bets.");
        return out;
    }
    for bet in bets {
        let legs: Vec<String> = bet
            .selections
            .iter()
            .map(|s| {
                let label = s.selection_label.as_deref().unwrap_or("?");
                match (&s.home_team, &s.away_team) {
                    (Some(h), Some(a)) => format!("{} ({} vs {})", label, h, a),
                    _ => label.to_string(),
                }
            })
            .collect();
        let _ = writeln!(
            out,
            "{:<8} {:>12} @ {:<6} -> {:>12}  {}",
            bet_status(bet).as_str().to_uppercase(),
            format_money(bet.stake.unwrap_or(0.0), currency),
            bet.total_odds.map(|o| format!("{:.2}", o)).unwrap_or_else(|| "-".into()),
            format_money(bet.potential_winnings.unwrap_or(0.0), currency),
            legs.join(", ")
        );
    }
    out
}

pub fn transaction_row(tx: &TransactionRecord, currency: &str) -> String {
    let sign = if is_credit(&tx.kind) { "+" } else { "-" };
    format!(
        "{:<14} {}{:<12} {:<10} {}",
        transaction_label(&tx.kind),
        sign,
        format_money(tx.amount.abs(), currency),
        tx.status.as_deref().unwrap_or("-"),
        tx.created_at.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::MatchRecord;
    use chrono::FixedOffset;
    use serde_json::json;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_match_time_relative_days() {
        let now = utc("2024-05-10T08:00:00Z");
        assert_eq!(format_match_time(&utc("2024-05-10T19:30:00Z"), &now), "Today, 19:30");
        assert_eq!(format_match_time(&utc("2024-05-11T00:05:00Z"), &now), "Tomorrow, 00:05");
        assert_eq!(format_match_time(&utc("2024-05-14T15:00:00Z"), &now), "14/05, 15:00");
    }

    #[test]
    fn test_match_time_uses_viewer_zone() {
        // 23:30 UTC is already tomorrow at UTC+2.
        let plus2 = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = utc("2024-05-10T12:00:00Z").with_timezone(&plus2);
        assert_eq!(format_match_time(&utc("2024-05-10T23:30:00Z"), &now), "Tomorrow, 01:30");
    }

    #[test]
    fn test_money() {
        assert_eq!(format_money(12.5, "GHS"), "GH₵12.50");
        assert_eq!(format_money(3.0, "USD"), "USD 3.00");
    }

    #[test]
    fn test_match_row_locked_and_live() {
        let view = MatchView::from_record(&MatchRecord::new(json!({
            "_id": "m1",
            "homeTeam": "Hearts",
            "awayTeam": "Kotoko",
            "status": "in_play",
            "goals": {"home": 1, "away": 0},
            "markets": {"h2h": [{"label": "Hearts", "odd": 1.8}]}
        })));
        let row = match_row(&view, &utc("2024-05-10T08:00:00Z"), false);
        assert!(row.contains("LIVE"));
        assert!(row.contains("Hearts 1 - 0 Kotoko"));
        assert!(row.contains("1 1.80"));
        assert!(row.contains("X 🔒"));
        assert!(row.ends_with("[m1]"));
    }

    #[test]
    fn test_status_colour_only_when_enabled() {
        let view = MatchView::from_record(&MatchRecord::new(json!({
            "_id": "m1", "homeTeam": "A", "awayTeam": "B", "status": "in_play"
        })));
        let now = utc("2024-05-10T08:00:00Z");
        assert!(!match_row(&view, &now, false).contains('\x1b'));
        assert!(match_row(&view, &now, true).contains("\x1b[38;2;76;175;80m"));
        assert_eq!(paint("x", "not-a-colour", true), "x");
    }

    #[test]
    fn test_header_shows_logo_or_initials() {
        let view = MatchView::from_record(&MatchRecord::new(json!({
            "_id": "m1",
            "homeTeam": "Accra Hearts",
            "awayTeam": "Kotoko",
            "homeTeamRef": {"logo": "https://cdn.example.com/hearts.png"}
        })));
        assert_eq!(
            match_header(&view),
            "Accra Hearts https://cdn.example.com/hearts.png vs Kotoko [K]"
        );
    }

    #[test]
    fn test_over_under_pairs_by_line() {
        let record = MatchRecord::new(json!({
            "_id": "m1",
            "odds": [{
                "_id": "ou1",
                "marketId": 5,
                "name": "Goals Over/Under",
                "type": "grouped",
                "selections": [
                    {"point": 2.5, "over": {"odd": 1.85}, "under": {"odd": 1.95}},
                    {"point": 3.5, "over": {"odd": 2.6}}
                ]
            }]
        }));
        let board = market_board(&crate::normalize::market_groups(&record));
        let lines: Vec<&str> = board.lines().collect();
        assert_eq!(lines[0], "Goals Over/Under");
        assert!(lines[1].contains("Over 2.5 1.85 [m1_5_over_2.5]"));
        assert!(lines[1].contains("Under 2.5 1.95 [m1_5_under_2.5]"));
        assert!(lines[2].contains("Over 3.5 2.60"));
        assert!(lines[2].trim_end().ends_with('-'));
    }

    #[test]
    fn test_empty_renders() {
        assert_eq!(bet_slip(&BetSlip::new(), "GHS"), "Bet slip is empty.\n");
        assert_eq!(market_board(&[]), "No markets available.\n");
    }

    #[test]
    fn test_transaction_row_sign() {
        let tx = TransactionRecord {
            kind: "bet_stake".into(),
            amount: -5.0,
            status: Some("completed".into()),
            ..Default::default()
        };
        let row = transaction_row(&tx, "GHS");
        assert!(row.starts_with("Bet Stake"));
        assert!(row.contains("-GH₵5.00"));
    }
}
