//! One handler per CLI command. Results go to stdout; failures come back as
//! `anyhow` errors carrying the user-facing message.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::api::models::MatchRecord;
use crate::api::{AuthResponse, BackendClient, MatchQuery, RegisterRequest};
use crate::bets::{bet_stats, filter_bets, place_slip, BetFilter, BetSlip, BetSlipItem, BetType};
use crate::config::{
    BetArgs, Command, Config, FavoritesAction, MatchArgs, MobileMoneyArgs, SettingsAction,
    ThemeAction, WithdrawArgs,
};
use crate::db::prefs::{AppSettings, AuthSession, Favorites, ProfileEdit, ThemeMode};
use crate::db::Database;
use crate::display;
use crate::error::{ClientError, ValidationError};
use crate::live::{watch_live, RealtimeHub, ViewGuard};
use crate::normalize::{market_groups, MatchView, OddsSelection};
use crate::wallet::payments::{transaction_status_color, BankTransferForm, MobileMoneyForm};
use crate::wallet::{WalletAction, WalletState};

/// Turn a backend failure into the message the user sees.
fn user_error(e: ClientError, fallback: &str) -> anyhow::Error {
    debug!("{}: {}", fallback, e);
    anyhow!(e.user_message(fallback))
}

/// Name on a verified wallet or bank account, wherever the backend put it.
fn account_holder(response: &Value) -> &str {
    let data = response.get("data").unwrap_or(response);
    ["accountName", "customerName", "name"]
        .iter()
        .find_map(|k| data.get(*k).and_then(Value::as_str))
        .unwrap_or("unknown")
}

/// `matchId:selectionId[=stake]` from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    pub match_id: String,
    pub selection_id: String,
    pub stake: Option<String>,
}

impl FromStr for Pick {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, stake) = match s.rsplit_once('=') {
            Some((t, stake)) => (t, Some(stake.trim().to_string())),
            None => (s, None),
        };
        let (match_id, selection_id) = target
            .split_once(':')
            .ok_or_else(|| format!("pick '{}' must look like matchId:selectionId", s))?;
        if match_id.trim().is_empty() || selection_id.trim().is_empty() {
            return Err(format!("pick '{}' must look like matchId:selectionId", s));
        }
        Ok(Pick {
            match_id: match_id.trim().to_string(),
            selection_id: selection_id.trim().to_string(),
            stake: stake.filter(|s| !s.is_empty()),
        })
    }
}

/// The selection a pick names, with its market key: the full market list
/// first, then the resolved 1X2 triple.
fn find_selection(record: &MatchRecord, view: &MatchView, id: &str) -> Option<(String, OddsSelection)> {
    market_groups(record)
        .into_iter()
        .find_map(|g| {
            let key = g.key;
            g.items.into_iter().find(|s| s.id == id).map(|s| (key, s))
        })
        .or_else(|| {
            view.h2h
                .as_ref()
                .and_then(|h2h| h2h.find(id))
                .map(|s| ("h2h".to_string(), s.clone()))
        })
}

/// Assemble a slip from picks against already-fetched match records.
pub fn build_slip(
    picks: &[Pick],
    records: &HashMap<String, MatchRecord>,
    shared_stake: Option<&str>,
    multiple: bool,
) -> Result<BetSlip> {
    let mut slip = BetSlip::new();
    for pick in picks {
        let record = records
            .get(&pick.match_id)
            .with_context(|| format!("match '{}' not found", pick.match_id))?;
        let view = MatchView::from_record(record);
        let (market, selection) = find_selection(record, &view, &pick.selection_id)
            .ok_or_else(|| ValidationError::UnknownSelection(pick.selection_id.clone()))?;
        let item = BetSlipItem::from_selection(&view, &selection, &market)
            .with_context(|| format!("selection '{}' is suspended", selection.name))?;
        let id = item.id.clone();
        slip.add(item);
        if let Some(stake) = &pick.stake {
            slip.update_stake(&id, stake);
        }
    }
    if let Some(stake) = shared_stake {
        slip.set_stake(stake);
    }
    if multiple {
        slip.set_bet_type(BetType::Multiple)?;
    } else {
        slip.apply_shared_stake();
    }
    Ok(slip)
}

pub struct App {
    config: Config,
    db: Database,
    client: BackendClient,
    session: Option<AuthSession>,
    wallet: WalletState,
}

impl App {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let client = BackendClient::new(&config.api_url, config.request_timeout())
            .context("building HTTP client")?;
        let session = AuthSession::load(&db)?;
        if let Some(s) = &session {
            client.set_token(Some(s.token.clone()));
            debug!("Restored session for {}", s.display_name());
        }
        let mut wallet = WalletState::new();
        wallet.currency = config.currency.clone();
        Ok(App {
            config,
            db,
            client,
            session,
            wallet,
        })
    }

    fn require_session(&self) -> Result<&AuthSession> {
        self.session
            .as_ref()
            .ok_or_else(|| anyhow!(ValidationError::SignInRequired.to_string()))
    }

    fn hub(&self) -> RealtimeHub {
        RealtimeHub::new(
            self.client.base_url(),
            self.session.as_ref().map(|s| s.token.clone()),
            self.config.reconnect_policy(),
        )
    }

    pub async fn run(mut self) -> Result<()> {
        match self.config.command.clone() {
            Command::Login {
                identifier,
                password,
            } => {
                let auth = self
                    .client
                    .login(&identifier, &password)
                    .await
                    .map_err(|e| user_error(e, "Login failed"))?;
                self.start_session(auth).await
            }
            Command::Register {
                phone,
                email,
                dob,
                password,
            } => {
                let req = RegisterRequest {
                    phone,
                    email,
                    dob,
                    id_type: None,
                    id_number: None,
                    password,
                };
                let auth = self
                    .client
                    .register(&req)
                    .await
                    .map_err(|e| user_error(e, "Registration failed"))?;
                self.start_session(auth).await
            }
            Command::Logout => self.logout().await,
            Command::Whoami => self.whoami().await,
            Command::Profile { phone, email, dob } => self.profile(ProfileEdit {
                phone_number: phone,
                email,
                date_of_birth: dob,
            }),
            Command::Sports => self.sports().await,
            Command::Leagues { sport } => self.leagues(sport.as_deref()).await,
            Command::Matches(args) => self.matches(args).await,
            Command::Live => self.live().await,
            Command::Match { id } => self.match_details(&id).await,
            Command::Bet(args) => self.bet(args).await,
            Command::Bets { filter, limit, id } => match id {
                Some(id) => self.bet_details(&id).await,
                None => self.bets(filter, limit).await,
            },
            Command::Balance { watch } => self.balance(watch).await,
            Command::Transactions { limit, id } => match id {
                Some(id) => self.transaction_status(&id).await,
                None => self.transactions(limit).await,
            },
            Command::Deposit(args) => self.deposit(args).await,
            Command::Withdraw(args) => self.withdraw(args).await,
            Command::Banks => self.banks().await,
            Command::Favorites { action } => self.favorites(action),
            Command::Theme { action } => self.theme(action),
            Command::Settings { action } => self.settings(action),
        }
    }

    // ── Session ──────────────────────────────────────────────────────────────

    async fn start_session(&mut self, auth: AuthResponse) -> Result<()> {
        let token = auth
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("Login failed"))?;
        self.client.set_token(Some(token.clone()));
        let user = match auth.user {
            Some(u) => u,
            None => self
                .client
                .me()
                .await
                .map_err(|e| user_error(e, "Login failed"))?
                .ok_or_else(|| anyhow!("Login failed"))?,
        };
        let session = AuthSession { token, user };
        session.save(&self.db)?;
        println!("Signed in as {}", session.display_name());
        self.session = Some(session);
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        if self.session.is_some() {
            if let Err(e) = self.client.logout().await {
                warn!("Server-side logout failed: {}", e);
            }
        }
        self.end_session()?;
        println!("Signed out.");
        Ok(())
    }

    /// Forget the token, the cached user and the wallet state.
    fn end_session(&mut self) -> Result<()> {
        AuthSession::clear(&self.db)?;
        self.client.set_token(None);
        self.session = None;
        self.wallet.reset();
        self.wallet.currency = self.config.currency.clone();
        Ok(())
    }

    async fn whoami(&mut self) -> Result<()> {
        self.require_session()?;
        match self.client.me().await {
            Ok(Some(user)) => {
                if let Some(session) = self.session.as_mut() {
                    session.update_user(&self.db, user)?;
                }
            }
            Ok(None) => {}
            Err(ClientError::Api { status: 401, .. }) => {
                self.end_session()?;
                bail!("Session expired, please sign in again.");
            }
            Err(e) => warn!("Could not refresh user, showing cached copy: {}", e),
        }
        let session = self.require_session()?;
        println!("{}", session.display_name());
        if let Some(at) = AuthSession::signed_in_at(&self.db)? {
            println!("Signed in since {}", at.with_timezone(&Local).format("%d/%m/%Y %H:%M"));
        }
        println!("{}", serde_json::to_string_pretty(&session.user)?);
        Ok(())
    }

    /// Edits stay local, like the cached user they change.
    fn profile(&mut self, edits: ProfileEdit) -> Result<()> {
        self.require_session()?;
        if let Some(session) = self.session.as_mut() {
            if !edits.is_empty() {
                session.edit_profile(&self.db, &edits)?;
                info!("Profile updated for {}", session.display_name());
            }
            for (label, key) in [
                ("Phone number", "phoneNumber"),
                ("Email", "email"),
                ("Date of birth", "dateOfBirth"),
            ] {
                let value = session.user[key].as_str().filter(|v| !v.is_empty());
                println!("{:<14} {}", label, value.unwrap_or("Not set"));
            }
        }
        Ok(())
    }

    // ── Catalog ──────────────────────────────────────────────────────────────

    async fn sports(&self) -> Result<()> {
        let sports = self
            .client
            .sports()
            .await
            .map_err(|e| user_error(e, "Failed to load sports"))?;
        for sport in sports {
            println!("{:<26} {}", sport.id, sport.name);
        }
        Ok(())
    }

    async fn leagues(&self, sport: Option<&str>) -> Result<()> {
        let leagues = self
            .client
            .leagues(sport, 100, 0)
            .await
            .map_err(|e| user_error(e, "Failed to load leagues"))?;
        for league in leagues {
            println!("{:<26} {}", league.id, league.title);
        }
        Ok(())
    }

    fn print_matches(&self, records: &[MatchRecord]) -> Result<()> {
        let favorites = Favorites::load(&self.db)?;
        let now = Local::now();
        let color = !self.config.no_color;
        if records.is_empty() {
            println!("No matches.");
        }
        for record in records {
            let view = MatchView::from_record(record);
            let star = if favorites.contains(&view.id) { "★" } else { " " };
            println!("{} {}", star, display::match_row(&view, &now, color));
        }
        Ok(())
    }

    async fn matches(&self, args: MatchArgs) -> Result<()> {
        let (start_date, end_date) = args.date_window(&Local::now());
        if let (Some(league), None, None, None, None, None) = (
            &args.league,
            &args.sport,
            &args.status,
            &args.search,
            &start_date,
            &end_date,
        ) {
            let records = self
                .client
                .league_matches(league)
                .await
                .map_err(|e| user_error(e, "Failed to load matches"))?;
            return self.print_matches(&records);
        }
        let query = MatchQuery {
            league_id: args.league,
            sport_id: args.sport,
            status: args.status,
            search: args.search,
            start_date,
            end_date,
            limit: args.limit,
            skip: args.skip,
        };
        let records = self
            .client
            .matches(&query)
            .await
            .map_err(|e| user_error(e, "Failed to load matches"))?;
        self.print_matches(&records)
    }

    async fn match_details(&self, id: &str) -> Result<()> {
        let record = self
            .client
            .match_details(id)
            .await
            .map_err(|e| user_error(e, "Failed to load match"))?;
        let view = MatchView::from_record(&record);
        println!("{}", display::match_header(&view));
        println!("{}", display::match_row(&view, &Local::now(), !self.config.no_color));
        println!();
        print!("{}", display::market_board(&market_groups(&record)));
        Ok(())
    }

    async fn live(&self) -> Result<()> {
        let hub = self.hub();
        let subscription = hub.subscribe();
        let favorites = Favorites::load(&self.db)?;
        let color = !self.config.no_color;

        let guard = ViewGuard::new();
        let closer = guard.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                closer.close();
            }
        });

        let list = watch_live(
            &self.client,
            subscription,
            self.config.live_refresh(),
            guard,
            |list, error| {
                let now = Local::now();
                print!("\x1B[2J\x1B[H");
                println!(
                    "Live matches ({}), push {}, Ctrl-C to exit\n",
                    list.len(),
                    if hub.is_connected() { "connected" } else { "off" }
                );
                for record in list.matches() {
                    let view = MatchView::from_record(record);
                    let star = if favorites.contains(&view.id) { "★" } else { " " };
                    println!("{} {}", star, display::match_row(&view, &now, color));
                }
                if let Some(message) = error {
                    println!("\n⚠ {}", message);
                }
            },
        )
        .await;

        hub.disconnect();
        info!("Live view closed with {} match(es) listed", list.len());
        Ok(())
    }

    // ── Bets ─────────────────────────────────────────────────────────────────

    async fn bet(&self, args: BetArgs) -> Result<()> {
        let picks = args
            .picks
            .iter()
            .map(|p| p.parse::<Pick>().map_err(|e| anyhow!(e)))
            .collect::<Result<Vec<_>>>()?;

        let mut records = HashMap::new();
        for pick in &picks {
            if records.contains_key(&pick.match_id) {
                continue;
            }
            let record = self
                .client
                .match_details(&pick.match_id)
                .await
                .map_err(|e| user_error(e, "Failed to load match"))?;
            records.insert(pick.match_id.clone(), record);
        }

        let settings = AppSettings::load(&self.db)?;
        let shared_stake = args.stake.clone().unwrap_or(settings.default_stake.clone());
        let mut slip = build_slip(&picks, &records, Some(&shared_stake), args.multiple)?;
        print!("{}", display::bet_slip(&slip, &self.config.currency));

        if args.dry_run {
            return Ok(());
        }
        if settings.confirm_bet_placement && !settings.quick_bet_enabled && !args.yes {
            println!("Run again with --yes to place these bets.");
            return Ok(());
        }

        let placed = place_slip(&self.client, &mut slip)
            .await
            .map_err(|e| user_error(e, "Failed to place bet"))?;
        println!("Placed {} bet(s).", placed.len());
        Ok(())
    }

    async fn bet_details(&self, id: &str) -> Result<()> {
        self.require_session()?;
        let bet = self
            .client
            .bet_details(id)
            .await
            .map_err(|e| user_error(e, "Failed to load bet"))?;
        let stats = bet_stats(std::slice::from_ref(&bet));
        print!("{}", display::bet_history(&[&bet], &stats, &self.config.currency));
        Ok(())
    }

    async fn bets(&self, filter: BetFilter, limit: u32) -> Result<()> {
        self.require_session()?;
        let bets = self
            .client
            .my_bets(limit, 0)
            .await
            .map_err(|e| user_error(e, "Failed to load bets"))?;
        let stats = bet_stats(&bets);
        let shown = filter_bets(&bets, filter);
        print!("{}", display::bet_history(&shown, &stats, &self.config.currency));
        Ok(())
    }

    // ── Wallet ───────────────────────────────────────────────────────────────

    async fn balance(&mut self, watch: bool) -> Result<()> {
        self.require_session()?;
        let balance = self
            .client
            .balance()
            .await
            .map_err(|e| user_error(e, "Failed to load balance"))?;
        self.wallet.apply_refresh(Ok(balance));
        println!("{}", display::format_money(self.wallet.balance, &self.wallet.currency));
        if !watch {
            return Ok(());
        }

        let hub = self.hub();
        let Some(mut events) = hub.subscribe() else {
            bail!(ValidationError::SignInRequired.to_string());
        };
        loop {
            let event = tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => event,
            };
            let Some(event) = event else { break };
            if !event.is_wallet_event() {
                continue;
            }
            let before = self.wallet.clone();
            if self.wallet.apply_event(&event) == WalletAction::Refresh {
                self.wallet.refresh(&self.client).await;
            }
            if self.wallet != before {
                println!("{}", display::format_money(self.wallet.balance, &self.wallet.currency));
            }
        }
        hub.disconnect();
        Ok(())
    }

    async fn transactions(&self, limit: u32) -> Result<()> {
        self.require_session()?;
        let txs = self
            .client
            .transactions(limit, 0)
            .await
            .map_err(|e| user_error(e, "Failed to load transactions"))?;
        if txs.is_empty() {
            println!("No transactions yet.");
        }
        for tx in &txs {
            println!("{}", display::transaction_row(tx, &self.config.currency));
        }
        Ok(())
    }

    async fn transaction_status(&self, id: &str) -> Result<()> {
        self.require_session()?;
        let status = self
            .client
            .transaction_status(id)
            .await
            .map_err(|e| user_error(e, "Failed to load transaction status"))?;
        let state = status["status"].as_str().unwrap_or("unknown");
        println!(
            "{}",
            display::paint(state, transaction_status_color(state), !self.config.no_color)
        );
        println!("{}", serde_json::to_string_pretty(&status)?);
        Ok(())
    }

    async fn deposit(&self, args: MobileMoneyArgs) -> Result<()> {
        self.require_session()?;
        let req = MobileMoneyForm {
            amount: args.amount,
            phone: args.phone,
            provider: args.provider,
            customer_name: args.name,
        }
        .validate()?;
        let response = self
            .client
            .deposit_mobile_money(&req)
            .await
            .map_err(|e| user_error(e, "Deposit error"))?;
        info!("Deposit of {:.2} requested via {}", req.amount, req.wallet_provider);
        println!(
            "{}",
            response["message"]
                .as_str()
                .unwrap_or("Deposit initiated. Check your phone for payment prompt.")
        );
        Ok(())
    }

    async fn withdraw(&self, args: WithdrawArgs) -> Result<()> {
        self.require_session()?;
        if args.bank {
            let req = BankTransferForm {
                amount: args.amount,
                account_number: args.account_number.unwrap_or_default(),
                sort_code: args.sort_code.unwrap_or_default(),
                customer_name: args.name.unwrap_or_default(),
                narration: args.narration,
            }
            .validate()?;
            if args.verify {
                let account = self
                    .client
                    .verify_bank_account(&req.account_number, &req.sort_code)
                    .await
                    .map_err(|e| user_error(e, "Could not verify bank account"))?;
                println!("Account holder: {}", account_holder(&account));
            }
            let response = self
                .client
                .withdraw_bank_transfer(&req)
                .await
                .map_err(|e| user_error(e, "Withdrawal error"))?;
            println!(
                "{}",
                response["message"].as_str().unwrap_or("Bank transfer initiated.")
            );
        } else {
            let req = MobileMoneyForm {
                amount: args.amount,
                phone: args.phone.unwrap_or_default(),
                provider: args.provider,
                customer_name: args.name,
            }
            .validate()?;
            if args.verify {
                let wallet = self
                    .client
                    .verify_wallet(&req.phone_number, req.wallet_provider.as_str())
                    .await
                    .map_err(|e| user_error(e, "Could not verify wallet"))?;
                println!("Wallet holder: {}", account_holder(&wallet));
            }
            let response = self
                .client
                .withdraw_mobile_money(&req)
                .await
                .map_err(|e| user_error(e, "Withdrawal error"))?;
            println!(
                "{}",
                response["message"]
                    .as_str()
                    .unwrap_or("Withdrawal initiated. Check your phone for confirmation.")
            );
        }
        Ok(())
    }

    async fn banks(&self) -> Result<()> {
        let banks = self
            .client
            .banks()
            .await
            .map_err(|e| user_error(e, "Failed to load banks"))?;
        for bank in banks {
            println!("{:<12} {}", bank.sort_code, bank.name);
        }
        Ok(())
    }

    // ── Local preferences ────────────────────────────────────────────────────

    fn favorites(&self, action: FavoritesAction) -> Result<()> {
        let mut favorites = Favorites::load(&self.db)?;
        match action {
            FavoritesAction::Add { match_id } => {
                if favorites.add(&match_id)? {
                    println!("Added {} to favourites.", match_id);
                }
            }
            FavoritesAction::Remove { match_id } => {
                if favorites.remove(&match_id)? {
                    println!("Removed {} from favourites.", match_id);
                }
            }
            FavoritesAction::List => {
                for id in favorites.ids() {
                    println!("{}", id);
                }
            }
            FavoritesAction::Clear => favorites.clear()?,
        }
        Ok(())
    }

    fn theme(&self, action: ThemeAction) -> Result<()> {
        let mut theme = ThemeMode::load(&self.db)?;
        if let ThemeAction::Toggle = action {
            theme = theme.toggle();
            theme.save(&self.db)?;
        }
        println!("{}", theme);
        Ok(())
    }

    fn settings(&self, action: SettingsAction) -> Result<()> {
        let settings = match action {
            SettingsAction::Show => AppSettings::load(&self.db)?,
            SettingsAction::Set { key, value } => {
                let mut settings = AppSettings::load(&self.db)?;
                settings.set_field(&key, &value)?;
                settings.save(&self.db)?;
                settings
            }
            SettingsAction::Reset => AppSettings::reset(&self.db)?,
        };
        for (key, value) in settings.entries() {
            println!("{:<26} {}", key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bets::submit::plan_submission;
    use approx::assert_relative_eq;
    use serde_json::json;
    use clap::Parser;

    fn records() -> HashMap<String, MatchRecord> {
        let m1 = MatchRecord::new(json!({
            "_id": "m1",
            "homeTeam": "Hearts",
            "awayTeam": "Kotoko",
            "markets": {"h2h": [
                {"label": "Home", "odd": 2.0},
                {"label": "Draw", "odd": 3.1},
                {"label": "Away"}
            ]}
        }));
        let m2 = MatchRecord::new(json!({
            "_id": "m2",
            "homeTeam": "Olympics",
            "awayTeam": "Dwarfs",
            "markets": {"h2h": [{"label": "Home", "odd": 1.5}]}
        }));
        HashMap::from([("m1".to_string(), m1), ("m2".to_string(), m2)])
    }

    fn pick(s: &str) -> Pick {
        s.parse().unwrap()
    }

    fn signed_in_app() -> App {
        let config = Config::try_parse_from(["betslip-client", "whoami"]).unwrap();
        let db = Database::open_in_memory().unwrap();
        AuthSession {
            token: "tok".into(),
            user: json!({"username": "ama"}),
        }
        .save(&db)
        .unwrap();
        App::new(config, db).unwrap()
    }

    #[test]
    fn test_end_session_forgets_everything() {
        let mut app = signed_in_app();
        assert!(app.client.is_authenticated());
        app.wallet.apply_update(Some(42.0), Some("USD"));

        app.end_session().unwrap();
        assert!(app.session.is_none());
        assert!(app.require_session().is_err());
        assert!(!app.client.is_authenticated());
        assert_eq!(AuthSession::load(&app.db).unwrap(), None);
        assert_relative_eq!(app.wallet.balance, 0.0);
        assert_eq!(app.wallet.currency, "GHS");
    }

    #[test]
    fn test_profile_edit_updates_cached_user() {
        let mut app = signed_in_app();
        app.profile(ProfileEdit {
            phone_number: Some("0241234567".into()),
            ..Default::default()
        })
        .unwrap();
        let stored = AuthSession::load(&app.db).unwrap().unwrap();
        assert_eq!(stored.user["phoneNumber"], "0241234567");
        assert_eq!(stored.user["username"], "ama");
        assert_eq!(app.session.as_ref().unwrap().user["phoneNumber"], "0241234567");
    }

    #[test]
    fn test_account_holder_lookup() {
        assert_eq!(account_holder(&json!({"data": {"accountName": "K. Mensah"}})), "K. Mensah");
        assert_eq!(account_holder(&json!({"name": "Ama"})), "Ama");
        assert_eq!(account_holder(&json!({"success": true})), "unknown");
    }

    #[test]
    fn test_pick_parsing() {
        assert_eq!(
            pick("m1:m1_h2h_Home=5"),
            Pick {
                match_id: "m1".into(),
                selection_id: "m1_h2h_Home".into(),
                stake: Some("5".into())
            }
        );
        assert_eq!(pick("m1:abc").stake, None);
        assert!("m1".parse::<Pick>().is_err());
        assert!(":abc".parse::<Pick>().is_err());
    }

    #[test]
    fn test_build_single_slip() {
        let slip = build_slip(
            &[pick("m1:m1_h2h_Home=5"), pick("m2:m2_h2h_Home")],
            &records(),
            Some("2"),
            false,
        )
        .unwrap();
        assert_eq!(slip.len(), 2);
        assert_eq!(slip.items()[0].selection, "Hearts");
        assert_eq!(slip.items()[0].market_type, "h2h");
        assert_eq!(slip.items()[1].stake.as_deref(), Some("2"));
        assert_relative_eq!(slip.potential_winnings(), 13.0);
    }

    #[test]
    fn test_single_summary_matches_planned_stakes() {
        let slip = build_slip(
            &[pick("m1:m1_h2h_Home"), pick("m2:m2_h2h_Home")],
            &records(),
            Some("10"),
            false,
        )
        .unwrap();
        let planned: f64 = plan_submission(&slip, true)
            .unwrap()
            .iter()
            .map(|bet| bet.stake)
            .sum();
        assert_relative_eq!(planned, 20.0);
        assert_relative_eq!(slip.total_stake(), planned);
        assert_relative_eq!(slip.potential_winnings(), 35.0);
        let summary = display::bet_slip(&slip, "GHS");
        assert!(summary.contains("Total stake:        GH₵20.00"));
        assert!(summary.contains("Potential winnings: GH₵35.00"));
    }

    #[test]
    fn test_build_multiple_slip() {
        let slip = build_slip(
            &[pick("m1:m1_h2h_Draw"), pick("m2:m2_h2h_Home")],
            &records(),
            Some("10"),
            true,
        )
        .unwrap();
        assert_eq!(slip.bet_type(), BetType::Multiple);
        assert_relative_eq!(slip.potential_winnings(), 46.5, epsilon = 1e-9);
    }

    #[test]
    fn test_build_rejects_unknown_and_locked() {
        let err = build_slip(&[pick("m1:nope")], &records(), None, false).unwrap_err();
        assert_eq!(err.to_string(), "Unknown selection 'nope'.");

        assert!(build_slip(&[pick("m1:m1_h2h_Away")], &records(), None, false).is_err());
        assert!(build_slip(&[pick("m9:x")], &records(), None, false).is_err());
    }

    #[test]
    fn test_multiple_needs_two_picks() {
        let err = build_slip(&[pick("m1:m1_h2h_Home")], &records(), Some("5"), true).unwrap_err();
        assert_eq!(
            err.to_string(),
            ValidationError::NotEnoughSelections.to_string()
        );
    }
}
