//! # Voting
//!
//! Every operation is a few lookups followed by at most one write, and every write is
//! a single atomic store operation, see [`crate::database`]. The lookups are not held
//! across the write: a vote checked a moment ago still exists since nothing deletes.
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::info;

use crate::{
    database::VoteStore,
    error::AppError,
    models::{Ballot, Campaign, Investor, NewCampaign, ProofOfWork, Vote},
    tally::{Results, tally},
};

#[derive(Debug, PartialEq, Eq)]
pub struct Voted {
    pub voted: bool,
    pub vote: Option<bool>,
}

pub struct VotingService {
    store: Arc<dyn VoteStore>,
    vote_window: Duration,
}

impl VotingService {
    pub fn new(store: Arc<dyn VoteStore>, vote_window_hours: i64) -> Self {
        Self {
            store,
            vote_window: Duration::hours(vote_window_hours),
        }
    }

    pub async fn create_campaign(&self, new_campaign: NewCampaign) -> Result<Campaign, AppError> {
        let campaign = Campaign {
            address: new_campaign.address,
            name: new_campaign.name,
            stages: new_campaign.stages,
            deadline: new_campaign.deadline,
        };

        self.store.insert_campaign(&campaign).await?;
        info!("Created campaign {}", campaign.address);

        Ok(campaign)
    }

    /// First vote of the campaign, whatever its stage.
    pub async fn votes_for_campaign(&self, campaign: &str) -> Result<Option<Vote>, AppError> {
        Ok(self
            .store
            .find_vote(campaign, None)
            .await?
            .map(|stored| stored.doc))
    }

    pub async fn vote_exists(&self, campaign: &str, stage: i64) -> Result<bool, AppError> {
        Ok(self.store.find_vote(campaign, Some(stage)).await?.is_some())
    }

    pub async fn investor_voted(
        &self,
        campaign: &str,
        stage: i64,
        investor_address: Option<&str>,
    ) -> Result<Voted, AppError> {
        let vote = self.store.find_vote(campaign, Some(stage)).await?;

        let ballot = vote.as_ref().zip(investor_address).and_then(|(stored, address)| {
            stored.doc.ballot_of(address).map(|ballot| ballot.vote)
        });

        Ok(Voted {
            voted: ballot.is_some(),
            vote: ballot,
        })
    }

    pub async fn create_vote(
        &self,
        campaign: &str,
        stage: i64,
        pow_text: String,
    ) -> Result<Vote, AppError> {
        self.create_vote_at(campaign, stage, pow_text, Utc::now())
            .await
    }

    async fn create_vote_at(
        &self,
        campaign: &str,
        stage: i64,
        pow_text: String,
        now: DateTime<Utc>,
    ) -> Result<Vote, AppError> {
        let vote = Vote {
            campaign: campaign.to_string(),
            stage,
            proof_of_work: ProofOfWork { text: pow_text },
            deadline: now.trunc_subsecs(3) + self.vote_window,
            votes: Vec::new(),
        };

        self.store.insert_vote(&vote).await?;
        info!("Created vote for campaign {campaign} stage {stage}");

        Ok(vote)
    }

    pub async fn register_investor(
        &self,
        campaign: &str,
        investor_address: &str,
        name: String,
    ) -> Result<Investor, AppError> {
        let investor = self
            .store
            .register_investor(investor_address, &name, campaign)
            .await?;
        info!("Registered investor {investor_address} for campaign {campaign}");

        Ok(investor)
    }

    /// Appends a ballot without looking for an earlier one from the same investor.
    pub async fn cast_vote(
        &self,
        campaign: &str,
        stage: i64,
        investor_address: &str,
        yes: bool,
    ) -> Result<(), AppError> {
        self.require_investor(investor_address).await?;

        let stored = self
            .store
            .find_vote(campaign, Some(stage))
            .await?
            .ok_or(AppError::VoteNotCreated)?;

        let ballot = Ballot {
            investor_address: investor_address.to_string(),
            vote: yes,
        };
        self.store.push_ballot(campaign, stored.slot, &ballot).await?;

        info!("Investor {investor_address} voted {yes} on campaign {campaign} stage {stage}");

        Ok(())
    }

    /// Rewrites every ballot the investor has on this stage.
    pub async fn change_vote(
        &self,
        campaign: &str,
        stage: i64,
        investor_address: &str,
        yes: bool,
    ) -> Result<(), AppError> {
        self.require_investor(investor_address).await?;

        let stored = self
            .store
            .find_vote(campaign, Some(stage))
            .await?
            .ok_or(AppError::VoteNotCreated)?;

        let changed = self
            .store
            .change_ballots(campaign, stored.slot, investor_address, yes)
            .await?;

        info!(
            "Investor {investor_address} changed {changed} ballot(s) to {yes} on campaign {campaign} stage {stage}"
        );

        Ok(())
    }

    pub async fn investor_vote(
        &self,
        campaign: &str,
        stage: i64,
        investor_address: Option<&str>,
    ) -> Result<Ballot, AppError> {
        let investor_address = investor_address
            .filter(|address| !address.is_empty())
            .ok_or(AppError::InvalidInvestorAddress)?;

        self.require_investor(investor_address).await?;

        let stored = self
            .store
            .find_vote(campaign, Some(stage))
            .await?
            .ok_or(AppError::VoteNotCreated)?;

        stored
            .doc
            .ballot_of(investor_address)
            .cloned()
            .ok_or(AppError::NotVotedYet)
    }

    pub async fn stage_stats(&self, campaign: &str, stage: i64) -> Result<Vote, AppError> {
        self.store
            .find_vote(campaign, Some(stage))
            .await?
            .map(|stored| stored.doc)
            .ok_or(AppError::VoteNotCreated)
    }

    pub async fn results(&self, campaign: &str, stage: i64) -> Result<Results, AppError> {
        let vote = self.stage_stats(campaign, stage).await?;

        Ok(tally(&vote, Utc::now()))
    }

    async fn require_investor(&self, investor_address: &str) -> Result<Investor, AppError> {
        self.store
            .find_investor(investor_address)
            .await?
            .ok_or(AppError::InvestorNotRegistered)
    }
}
