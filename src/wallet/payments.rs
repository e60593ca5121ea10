//! Mobile money and bank transfer forms, checked before anything is sent.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::bets::slip::parse_amount;
use crate::error::ValidationError;

/// Upstream payment rail for mobile money; the backend expects this value.
pub const MOBILE_MONEY_RAIL: &str = "orange_money";
pub const BANK_RAIL: &str = "bank";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WalletProvider {
    #[serde(rename = "MTN")]
    Mtn,
    #[serde(rename = "TELECEL")]
    Telecel,
    #[serde(rename = "AIRTELTIGO")]
    AirtelTigo,
}

impl WalletProvider {
    pub const ALL: [WalletProvider; 3] = [
        WalletProvider::Mtn,
        WalletProvider::Telecel,
        WalletProvider::AirtelTigo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WalletProvider::Mtn => "MTN",
            WalletProvider::Telecel => "TELECEL",
            WalletProvider::AirtelTigo => "AIRTELTIGO",
        }
    }
}

impl fmt::Display for WalletProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WalletProvider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown wallet provider '{}' (MTN, TELECEL, AIRTELTIGO)", s))
    }
}

/// Network from the Ghanaian number prefix, whitespace ignored.
pub fn detect_wallet_provider(phone: &str) -> Option<WalletProvider> {
    let clean: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let prefix = clean.get(..3)?;
    match prefix {
        "024" | "054" | "055" | "059" => Some(WalletProvider::Mtn),
        "020" | "050" => Some(WalletProvider::Telecel),
        "027" | "057" | "026" | "056" => Some(WalletProvider::AirtelTigo),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileMoneyRequest {
    pub amount: f64,
    pub provider: String,
    pub phone_number: String,
    pub wallet_provider: WalletProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransferRequest {
    pub amount: f64,
    pub account_number: String,
    pub sort_code: String,
    pub customer_name: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
}

fn valid_amount(raw: &str) -> Result<f64, ValidationError> {
    parse_amount(raw)
        .filter(|v| *v > 0.0)
        .ok_or(ValidationError::InvalidAmount)
}

/// Raw deposit / withdrawal input as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct MobileMoneyForm {
    pub amount: String,
    pub phone: String,
    /// Explicit choice; falls back to prefix detection.
    pub provider: Option<WalletProvider>,
    pub customer_name: Option<String>,
}

impl MobileMoneyForm {
    pub fn validate(&self) -> Result<MobileMoneyRequest, ValidationError> {
        let amount = valid_amount(&self.amount)?;
        if self.phone.chars().count() < 10 {
            return Err(ValidationError::InvalidPhone);
        }
        let wallet_provider = self
            .provider
            .or_else(|| detect_wallet_provider(&self.phone))
            .ok_or(ValidationError::MissingProvider)?;

        Ok(MobileMoneyRequest {
            amount,
            provider: MOBILE_MONEY_RAIL.to_string(),
            phone_number: self.phone.clone(),
            wallet_provider,
            customer_name: self
                .customer_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BankTransferForm {
    pub amount: String,
    pub account_number: String,
    pub sort_code: String,
    pub customer_name: String,
    pub narration: Option<String>,
}

impl BankTransferForm {
    pub fn validate(&self) -> Result<BankTransferRequest, ValidationError> {
        let amount = valid_amount(&self.amount)?;
        if self.account_number.trim().is_empty() || self.sort_code.trim().is_empty() {
            return Err(ValidationError::MissingBankDetails);
        }
        Ok(BankTransferRequest {
            amount,
            account_number: self.account_number.trim().to_string(),
            sort_code: self.sort_code.trim().to_string(),
            customer_name: self.customer_name.clone(),
            provider: BANK_RAIL.to_string(),
            narration: self.narration.clone(),
        })
    }
}

pub fn transaction_label(kind: &str) -> &str {
    match kind {
        "deposit" => "Deposit",
        "withdrawal" => "Withdrawal",
        "bet_stake" => "Bet Stake",
        "bet_win" => "Bet Win",
        "bank_transfer" => "Bank Transfer",
        other => other,
    }
}

/// Money flowing into the wallet.
pub fn is_credit(kind: &str) -> bool {
    matches!(kind, "deposit" | "bet_win")
}

pub fn transaction_status_color(status: &str) -> &'static str {
    match status {
        "completed" => "#4CAF50",
        "pending" => "#FFA726",
        "failed" => "#F44336",
        "cancelled" => "#9E9E9E",
        _ => "#FE6B3C",
    }
}
