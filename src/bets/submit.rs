use futures_util::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::slip::{parse_amount, BetSlip, BetSlipItem, BetType};
use crate::api::BackendClient;
use crate::error::{ClientError, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    pub odd_id: String,
    pub selection_label: String,
}

impl From<&BetSlipItem> for SelectionRequest {
    fn from(item: &BetSlipItem) -> Self {
        SelectionRequest {
            odd_id: item.odd_id.clone(),
            selection_label: item.selection_label.clone(),
        }
    }
}

/// Body of `POST /bets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetRequest {
    pub stake: f64,
    pub selections: Vec<SelectionRequest>,
}

fn positive(value: &str) -> Option<f64> {
    parse_amount(value).filter(|v| *v > 0.0)
}

/// Turn the slip into the requests to send, or the inline validation error.
/// Nothing is sent unless every request has a positive stake.
pub fn plan_submission(
    slip: &BetSlip,
    authenticated: bool,
) -> Result<Vec<BetRequest>, ValidationError> {
    if !authenticated {
        return Err(ValidationError::SignInRequired);
    }
    if slip.is_empty() {
        return Ok(vec![]);
    }

    match slip.bet_type() {
        BetType::Single => {
            let shared = positive(slip.stake());
            slip.items()
                .iter()
                .map(|item| {
                    let stake = item
                        .stake
                        .as_deref()
                        .and_then(positive)
                        .or(shared)
                        .ok_or(ValidationError::MissingStakes)?;
                    Ok(BetRequest {
                        stake,
                        selections: vec![item.into()],
                    })
                })
                .collect()
        }
        BetType::Multiple => {
            let stake = positive(slip.stake()).ok_or(ValidationError::MissingTotalStake)?;
            Ok(vec![BetRequest {
                stake,
                selections: slip.items().iter().map(SelectionRequest::from).collect(),
            }])
        }
    }
}

/// Validate and place every bet on the slip concurrently. The slip is cleared
/// only when all of them were accepted.
pub async fn place_slip(
    client: &BackendClient,
    slip: &mut BetSlip,
) -> Result<Vec<Value>, ClientError> {
    let plan = plan_submission(slip, client.is_authenticated())?;
    if plan.is_empty() {
        return Ok(vec![]);
    }

    let placed = try_join_all(plan.iter().map(|bet| client.place_bet(bet)))
        .await
        .map_err(|e| {
            warn!("Bet placement failed: {}", e);
            e
        })?;

    info!("Placed {} bet(s)", placed.len());
    slip.clear();
    Ok(placed)
}
