//! The financial advice generator.
//!
//! Builds a prompt from the caller's aggregated transaction summary and sends
//! it to an external text-generation API. The generator is best-effort by
//! design: network failures, quota errors, and missing configuration degrade
//! to an error string in the response body. They never fail the request and
//! never touch the derivation engines.

use std::env;

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Date;

use crate::{
    AppState, Error,
    ledger::{net_liquidity, top_spending_categories},
    reward::Tier,
    timezone::local_today,
    transaction::{Transaction, list_transactions_for_user},
    user::{UserID, get_user_by_id},
};

/// How many recent transactions the prompt summarizes.
const RECENT_ACTIVITY_COUNT: usize = 15;

/// The config for the external advice generator.
#[derive(Debug, Clone)]
pub struct AdviceConfig {
    /// The API key. Advice is reported as unavailable when unset.
    pub api_key: Option<String>,
    /// The base URL of the generateContent API.
    pub base_url: String,
    /// The model name to request.
    pub model: String,
    client: reqwest::Client,
}

impl AdviceConfig {
    /// Build the config from the environment.
    ///
    /// Reads `ADVICE_API_KEY`, and optionally `ADVICE_BASE_URL` and
    /// `ADVICE_MODEL` for overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = env::var("ADVICE_API_KEY").ok();

        if let Ok(base_url) = env::var("ADVICE_BASE_URL") {
            config.base_url = base_url;
        }

        if let Ok(model) = env::var("ADVICE_MODEL") {
            config.model = model;
        }

        config
    }
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_owned(),
            model: "gemini-2.0-flash".to_owned(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(20))
                .build()
                .expect("Could not build HTTP client"),
        }
    }
}

/// Why advice could not be generated. The message is shown inline to the
/// user in place of the advice text.
#[derive(Debug, thiserror::Error, PartialEq)]
enum AdviceError {
    #[error("the advice generator is not configured")]
    MissingApiKey,

    #[error("could not reach the advice generator: {0}")]
    Request(String),

    #[error("the advice generator returned an empty response")]
    EmptyResponse,
}

/// Build the strategist prompt from the user's aggregates.
///
/// The numbers come from the same ledger folds the dashboard uses, so the
/// advice always talks about what the user is looking at.
fn build_advice_prompt(
    name: &str,
    tier: Tier,
    transactions: &[Transaction],
    today: Date,
) -> String {
    let monthly_spending =
        top_spending_categories(transactions, today.year(), today.month(), usize::MAX);
    let current_spend: f64 = monthly_spending.iter().map(|spend| spend.total).sum();
    let top_category = monthly_spending
        .first()
        .map(|spend| spend.category.as_str())
        .unwrap_or("General");

    let recent_activity = transactions
        .iter()
        .take(RECENT_ACTIVITY_COUNT)
        .map(|transaction| {
            format!(
                "{}: {} ({})",
                transaction.kind.as_str(),
                transaction.amount,
                transaction.category
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Act as a financial strategist for {name} (tier: {tier}).\n\
        Net liquidity: {net}. Spend this month: {current_spend}, \
        top category \"{top_category}\".\n\
        Recent activity: {recent_activity}.\n\
        Provide sharp, professional 2-3 sentence advice focused on wealth \
        growth and discipline.",
        tier = tier.as_str(),
        net = net_liquidity(transactions),
    )
}

/// Ask the external API to generate advice text for `prompt`.
async fn generate_advice(config: &AdviceConfig, prompt: &str) -> Result<String, AdviceError> {
    let api_key = config.api_key.as_deref().ok_or(AdviceError::MissingApiKey)?;

    let url = format!(
        "{}/v1beta/models/{}:generateContent?key={}",
        config.base_url, config.model, api_key
    );
    let body = json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
    });

    let response = config
        .client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|error| AdviceError::Request(error.to_string()))?;

    let response = response
        .error_for_status()
        .map_err(|error| AdviceError::Request(error.to_string()))?;

    let payload: serde_json::Value = response
        .json()
        .await
        .map_err(|error| AdviceError::Request(error.to_string()))?;

    payload
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|text| text.as_str())
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
        .ok_or(AdviceError::EmptyResponse)
}

/// The advice response. Exactly one of the fields is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceResponse {
    /// The generated advice text.
    pub advice: Option<String>,
    /// The inline error message shown in place of the advice.
    pub error: Option<String>,
}

/// Handler for advice requests.
///
/// Generation failures come back as a 200 with `error` set; they are part of
/// the response, not an HTTP failure.
pub async fn get_advice(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<AdviceResponse>, Error> {
    let today = local_today(&state.local_timezone)?;

    let prompt = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;
        let user = get_user_by_id(user_id, &connection)?;
        let transactions = list_transactions_for_user(user_id, &connection)?;

        build_advice_prompt(&user.name, user.tier(), &transactions, today)
        // The lock is released here; the outbound request must not hold up
        // other database work.
    };

    match generate_advice(&state.advice, &prompt).await {
        Ok(advice) => Ok(Json(AdviceResponse {
            advice: Some(advice),
            error: None,
        })),
        Err(error) => {
            tracing::warn!("advice generation failed for user {user_id}: {error}");
            Ok(Json(AdviceResponse {
                advice: None,
                error: Some(error.to_string()),
            }))
        }
    }
}
