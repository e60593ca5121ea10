use chrono::{DateTime, Months, NaiveDate, SecondsFormat, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use std::str::FromStr;
use std::time::Duration;

use crate::bets::BetFilter;
use crate::live::ReconnectPolicy;
use crate::wallet::payments::WalletProvider;

/// Terminal sportsbook client: live odds, bet slip and wallet
#[derive(Parser, Debug, Clone)]
#[command(name = "betslip-client", version, about)]
pub struct Config {
    /// Sportsbook backend base URL (the `/api` prefix is added per request)
    #[arg(
        long,
        env = "SPORTSBOOK_API_URL",
        default_value = "https://8bet-backend.nla-fidelity.org",
        global = true
    )]
    pub api_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30", global = true)]
    pub request_timeout_secs: u64,

    /// SQLite file holding the session token and preferences
    #[arg(long, env = "DATABASE_PATH", default_value = "sportsbook.db", global = true)]
    pub database_path: String,

    /// Live match list re-poll interval in seconds
    #[arg(long, env = "LIVE_REFRESH_SECS", default_value = "30", global = true)]
    pub live_refresh_secs: u64,

    /// Real-time channel reconnect attempts before giving up
    #[arg(long, env = "RECONNECT_ATTEMPTS", default_value = "5", global = true)]
    pub reconnect_attempts: u32,

    /// First reconnect delay in milliseconds (doubles per attempt)
    #[arg(long, env = "RECONNECT_DELAY_MS", default_value = "1000", global = true)]
    pub reconnect_delay_ms: u64,

    /// Reconnect delay cap in milliseconds
    #[arg(long, env = "RECONNECT_DELAY_MAX_MS", default_value = "5000", global = true)]
    pub reconnect_delay_max_ms: u64,

    /// Display currency until the wallet reports one
    #[arg(long, env = "CURRENCY", default_value = "GHS", global = true)]
    pub currency: String,

    /// Plain output without terminal colours
    #[arg(long, env = "NO_COLOR", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and cache the session token
    Login {
        /// Username, email or phone number
        identifier: String,
        #[arg(long, env = "SPORTSBOOK_PASSWORD")]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long, required_unless_present = "email")]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        dob: Option<String>,
        #[arg(long, env = "SPORTSBOOK_PASSWORD")]
        password: String,
    },
    /// Sign out and forget the cached session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Edit the cached profile (phone number, email, date of birth)
    Profile {
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        dob: Option<String>,
    },
    /// List sports
    Sports,
    /// List leagues, optionally for one sport
    Leagues {
        #[arg(long)]
        sport: Option<String>,
    },
    /// List matches
    Matches(MatchArgs),
    /// Watch live matches until Ctrl-C
    Live,
    /// Show one match with every market
    Match { id: String },
    /// Build a bet slip and place it
    Bet(BetArgs),
    /// Bet history
    Bets {
        #[arg(long, default_value = "all")]
        filter: BetFilter,
        #[arg(long, default_value = "50")]
        limit: u32,
        /// Show a single bet instead of the history
        #[arg(long)]
        id: Option<String>,
    },
    /// Wallet balance
    Balance {
        /// Keep running and print balance changes pushed by the backend
        #[arg(long)]
        watch: bool,
    },
    /// Wallet transactions
    Transactions {
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Check the processing status of one transaction
        #[arg(long)]
        id: Option<String>,
    },
    /// Deposit via mobile money
    Deposit(MobileMoneyArgs),
    /// Withdraw via mobile money, or to a bank account with --bank
    Withdraw(WithdrawArgs),
    /// Banks supported for transfers
    Banks,
    /// Favourite matches
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Colour theme preference
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
    /// App settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct MatchArgs {
    #[arg(long)]
    pub sport: Option<String>,
    #[arg(long)]
    pub league: Option<String>,
    /// scheduled, in_play, finished or all
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    /// all, today, tomorrow, week or month
    #[arg(long, default_value = "all", conflicts_with_all = ["from", "to"])]
    pub range: DateRange,
    /// Custom range start, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Custom range end, YYYY-MM-DD
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long, default_value = "10")]
    pub limit: u32,
    #[arg(long, default_value = "0")]
    pub skip: u32,
}

/// Kickoff window presets for the match list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    All,
    Today,
    Tomorrow,
    Week,
    Month,
}

impl FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(DateRange::All),
            "today" => Ok(DateRange::Today),
            "tomorrow" => Ok(DateRange::Tomorrow),
            "week" => Ok(DateRange::Week),
            "month" => Ok(DateRange::Month),
            other => Err(format!("unknown date range '{}'", other)),
        }
    }
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl MatchArgs {
    /// `startDate`/`endDate` for the match query. Presets start at the
    /// viewer's local midnight; `--from`/`--to` dates are taken as UTC
    /// midnight.
    pub fn date_window<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> (Option<String>, Option<String>) {
        if self.from.is_some() || self.to.is_some() {
            let at_midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|t| iso(t.and_utc()));
            return (
                self.from.and_then(at_midnight),
                self.to.and_then(at_midnight),
            );
        }
        let today = now.date_naive();
        let (start, end) = match self.range {
            DateRange::All => return (None, None),
            DateRange::Today => (today, today.succ_opt()),
            DateRange::Tomorrow => match today.succ_opt() {
                Some(tomorrow) => (tomorrow, tomorrow.succ_opt()),
                None => return (None, None),
            },
            DateRange::Week => (today, today.checked_add_days(chrono::Days::new(7))),
            DateRange::Month => (today, today.checked_add_months(Months::new(1))),
        };
        let local_midnight = |d: NaiveDate| {
            d.and_hms_opt(0, 0, 0)
                .and_then(|t| now.timezone().from_local_datetime(&t).earliest())
                .map(|t| iso(t.with_timezone(&Utc)))
        };
        (local_midnight(start), end.and_then(local_midnight))
    }
}

#[derive(Args, Debug, Clone)]
pub struct BetArgs {
    /// `matchId:selectionId`, optionally `=stake`; repeatable
    #[arg(long = "pick", required = true)]
    pub picks: Vec<String>,
    /// Shared stake (the only stake for --multiple)
    #[arg(long)]
    pub stake: Option<String>,
    /// Combine all picks into one accumulator
    #[arg(long)]
    pub multiple: bool,
    /// Show the slip without placing it
    #[arg(long)]
    pub dry_run: bool,
    /// Place without the confirmation step (see the `confirmBetPlacement` setting)
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MobileMoneyArgs {
    #[arg(long)]
    pub amount: String,
    #[arg(long)]
    pub phone: String,
    /// MTN, TELECEL or AIRTELTIGO; detected from the number when omitted
    #[arg(long)]
    pub provider: Option<WalletProvider>,
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct WithdrawArgs {
    #[arg(long)]
    pub amount: String,
    /// Withdraw to a bank account instead of mobile money
    #[arg(long)]
    pub bank: bool,
    #[arg(long, required_unless_present = "bank")]
    pub phone: Option<String>,
    #[arg(long)]
    pub provider: Option<WalletProvider>,
    #[arg(long)]
    pub account_number: Option<String>,
    /// Bank sort code (see `banks`)
    #[arg(long)]
    pub sort_code: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub narration: Option<String>,
    /// Look the destination account up before withdrawing
    #[arg(long)]
    pub verify: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FavoritesAction {
    Add { match_id: String },
    Remove { match_id: String },
    List,
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ThemeAction {
    Show,
    Toggle,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    Show,
    /// Set one setting by its camelCase name
    Set { key: String, value: String },
    Reset,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.api_url)
            .map_err(|e| anyhow::anyhow!("api_url '{}' is not a valid URL: {}", self.api_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("api_url must use http or https");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if self.live_refresh_secs == 0 {
            anyhow::bail!("live_refresh_secs must be positive");
        }
        if self.reconnect_delay_ms == 0 {
            anyhow::bail!("reconnect_delay_ms must be positive");
        }
        if self.reconnect_delay_max_ms < self.reconnect_delay_ms {
            anyhow::bail!("reconnect_delay_max_ms must not be below reconnect_delay_ms");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn live_refresh(&self) -> Duration {
        Duration::from_secs(self.live_refresh_secs)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.reconnect_attempts,
            base_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_delay: Duration::from_millis(self.reconnect_delay_max_ms),
            ..ReconnectPolicy::default()
        }
    }
}
