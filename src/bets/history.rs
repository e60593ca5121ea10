use std::str::FromStr;

use super::status::{bet_status, BetStatus};
use crate::api::models::BetRecord;

/// Tabs on the bet history screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetFilter {
    All,
    Pending,
    Won,
    Lost,
}

impl BetFilter {
    pub fn matches(self, bet: &BetRecord) -> bool {
        let status = bet_status(bet);
        match self {
            BetFilter::All => true,
            BetFilter::Pending => status == BetStatus::Pending,
            BetFilter::Won => status == BetStatus::Won,
            BetFilter::Lost => status == BetStatus::Lost,
        }
    }
}

impl FromStr for BetFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(BetFilter::All),
            "pending" => Ok(BetFilter::Pending),
            "won" => Ok(BetFilter::Won),
            "lost" => Ok(BetFilter::Lost),
            other => Err(format!("unknown bet filter '{}'", other)),
        }
    }
}

pub fn filter_bets(bets: &[BetRecord], filter: BetFilter) -> Vec<&BetRecord> {
    bets.iter().filter(|b| filter.matches(b)).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BetStats {
    pub total: usize,
    pub pending: usize,
    pub won: usize,
    pub lost: usize,
    pub total_staked: f64,
    /// Sum of `potentialWinnings` over won bets.
    pub total_winnings: f64,
}

pub fn bet_stats(bets: &[BetRecord]) -> BetStats {
    let mut stats = BetStats {
        total: bets.len(),
        ..Default::default()
    };
    for bet in bets {
        stats.total_staked += bet.stake.unwrap_or(0.0);
        match bet_status(bet) {
            BetStatus::Pending => stats.pending += 1,
            BetStatus::Won => {
                stats.won += 1;
                stats.total_winnings += bet.potential_winnings.unwrap_or(0.0);
            }
            BetStatus::Lost => stats.lost += 1,
            BetStatus::Void => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::BetSelectionRecord;
    use approx::assert_relative_eq;

    fn bet(status: &str, stake: f64, winnings: f64) -> BetRecord {
        BetRecord {
            status: Some(status.into()),
            stake: Some(stake),
            potential_winnings: Some(winnings),
            ..Default::default()
        }
    }

    #[test]
    fn test_stats() {
        let mut stale = bet("pending", 5.0, 12.0);
        stale.selections = vec![BetSelectionRecord {
            result: Some("won".into()),
            ..Default::default()
        }];
        let bets = vec![
            bet("won", 10.0, 30.0),
            bet("lost", 20.0, 50.0),
            bet("pending", 2.0, 4.0),
            bet("void", 1.0, 1.0),
            stale,
        ];
        let stats = bet_stats(&bets);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.won, 2);
        assert_eq!(stats.lost, 1);
        assert_eq!(stats.pending, 1);
        assert_relative_eq!(stats.total_staked, 38.0);
        assert_relative_eq!(stats.total_winnings, 42.0);
    }

    #[test]
    fn test_filter_uses_derived_status() {
        let bets = vec![bet("won", 1.0, 2.0), bet("lost", 1.0, 2.0), bet("pending", 1.0, 2.0)];
        assert_eq!(filter_bets(&bets, BetFilter::All).len(), 3);
        assert_eq!(filter_bets(&bets, BetFilter::Won).len(), 1);
        assert_eq!(filter_bets(&bets, BetFilter::Pending).len(), 1);
        assert_eq!("LOST".parse::<BetFilter>(), Ok(BetFilter::Lost));
        assert!("void".parse::<BetFilter>().is_err());
    }
}
