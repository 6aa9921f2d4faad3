//! # Documents
//!
//! Everything persisted in the store plus the JSON payloads the routes accept.
//!
//! ## Collections
//!
//! - Campaign: `address`, `name`, `stages`, optional `deadline`. Never mutated.
//! - Investor: `address` (unique), `name`, `investedIn`. Append only.
//! - Vote: one per campaign + stage, with its own `deadline` and a list of ballots.
//!
//! Ballots are not unique per investor. Casting twice appends twice, changing a vote
//! rewrites every ballot of that investor.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Campaign {
    pub address: String,
    pub name: String,
    #[serde(default)]
    pub stages: Vec<Value>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    pub address: String,
    pub name: String,
    pub invested_in: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProofOfWork {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub investor_address: String,
    pub vote: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub campaign: String,
    pub stage: i64,
    pub proof_of_work: ProofOfWork,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub votes: Vec<Ballot>,
}

impl Vote {
    pub fn ballot_of(&self, investor_address: &str) -> Option<&Ballot> {
        self.votes
            .iter()
            .find(|ballot| ballot.investor_address == investor_address)
    }
}

#[derive(Deserialize)]
pub struct NewCampaign {
    pub address: String,
    pub name: String,
    #[serde(default)]
    pub stages: Vec<Value>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVote {
    #[serde(default)]
    pub stage: Value,
    #[serde(default)]
    pub pow_text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvestor {
    pub investor_address: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotRequest {
    pub yes: bool,
    pub investor_address: String,
}

#[derive(Deserialize)]
pub struct VotedRequest {
    pub address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorQuery {
    pub investor_address: Option<String>,
}

/// Reads a stage the way `parseInt` would: optional sign, then leading digits, rest
/// ignored. `"3rd"` is stage 3, `"-2"` is stage -2, `"stage"` is no stage at all.
pub fn parse_stage(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let digits: String = unsigned.chars().take_while(char::is_ascii_digit).collect();
    let magnitude: i64 = digits.parse().ok()?;

    Some(if negative { -magnitude } else { magnitude })
}

/// Body stages arrive as JSON numbers or strings. Fractions are truncated.
pub fn parse_stage_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(text) => parse_stage(text),
        _ => None,
    }
}
