//! # Redis
//!
//! Document store for campaigns, investors and stage votes.
//!
//! ## Layout
//!
//! - `campaigns`: list of campaign JSON documents, insertion order, duplicates allowed
//! - `investors`: hash of investor address to investor JSON document (name only)
//! - `invested:{investor}`: list of campaign addresses the investor registered for
//! - `votes:{campaign}`: list of vote JSON documents for one campaign, insertion order
//! - `ballots:{campaign}:{slot}`: list of ballot JSON documents for the vote at `slot`
//!
//! ## Lookups
//!
//! Every lookup returns the first matching document in insertion order, the same
//! answer a `findOne` over the collection would give. A vote is addressed by the
//! slot it occupies in `votes:{campaign}`, and slots never move since nothing is
//! ever removed.
//!
//! ## Writes
//!
//! Ballots and investments live in their own lists so every write is a single
//! atomic Redis operation:
//! - casting is one `RPUSH`
//! - changing a vote is one Lua script rewriting matching ballots in place
//! - registering is `HSETNX` + `RPUSH` inside `MULTI`
//!
//! Concurrent casts all land. Nothing checks whether the investor already voted,
//! so one investor casting twice stores two ballots.
use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    error::StoreError,
    models::{Ballot, Campaign, Investor, Vote},
};

pub const CAMPAIGNS_KEY: &str = "campaigns";
pub const INVESTORS_KEY: &str = "investors";
pub const INVESTED_PREFIX: &str = "invested";
pub const VOTES_PREFIX: &str = "votes";
pub const BALLOTS_PREFIX: &str = "ballots";

const CHANGE_BALLOTS: &str = r#"
local entries = redis.call('LRANGE', KEYS[1], 0, -1)
local changed = 0
for i, raw in ipairs(entries) do
    local ballot = cjson.decode(raw)
    if ballot.investorAddress == ARGV[1] then
        ballot.vote = ARGV[2] == '1'
        redis.call('LSET', KEYS[1], i - 1, cjson.encode(ballot))
        changed = changed + 1
    end
end
return changed
"#;

/// A document together with the list slot it was read from.
#[derive(Debug, Clone)]
pub struct Stored<T> {
    pub slot: usize,
    pub doc: T,
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StoreError>;

    async fn find_investor(&self, address: &str) -> Result<Option<Investor>, StoreError>;

    /// Creates the investor on first sight, then appends `campaign` to its investments.
    /// A name given for an existing investor is ignored.
    async fn register_investor(
        &self,
        address: &str,
        name: &str,
        campaign: &str,
    ) -> Result<Investor, StoreError>;

    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError>;

    /// First vote of the campaign, restricted to `stage` when one is given.
    async fn find_vote(
        &self,
        campaign: &str,
        stage: Option<i64>,
    ) -> Result<Option<Stored<Vote>>, StoreError>;

    async fn push_ballot(
        &self,
        campaign: &str,
        slot: usize,
        ballot: &Ballot,
    ) -> Result<(), StoreError>;

    /// Sets `vote` on every ballot of the investor, returning how many were touched.
    async fn change_ballots(
        &self,
        campaign: &str,
        slot: usize,
        investor_address: &str,
        yes: bool,
    ) -> Result<usize, StoreError>;
}

pub fn votes_key(campaign: &str) -> String {
    format!("{VOTES_PREFIX}:{campaign}")
}

pub fn ballots_key(campaign: &str, slot: usize) -> String {
    format!("{BALLOTS_PREFIX}:{campaign}:{slot}")
}

pub fn invested_key(investor: &str) -> String {
    format!("{INVESTED_PREFIX}:{investor}")
}

fn first_vote(votes: impl IntoIterator<Item = Vote>, stage: Option<i64>) -> Option<Stored<Vote>> {
    votes
        .into_iter()
        .enumerate()
        .find(|(_, vote)| stage.is_none_or(|stage| vote.stage == stage))
        .map(|(slot, doc)| Stored { slot, doc })
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}

pub struct RedisStore {
    connection: ConnectionManager,
    change_ballots: Script,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            change_ballots: Script::new(CHANGE_BALLOTS),
        }
    }
}

#[async_trait]
impl VoteStore for RedisStore {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();

        conn.rpush::<_, _, ()>(CAMPAIGNS_KEY, serde_json::to_string(campaign)?)
            .await?;

        Ok(())
    }

    async fn find_investor(&self, address: &str) -> Result<Option<Investor>, StoreError> {
        let mut conn = self.connection.clone();

        let raw: Option<String> = conn.hget(INVESTORS_KEY, address).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let mut investor: Investor = serde_json::from_str(&raw)?;
        investor.invested_in = conn.lrange(invested_key(address), 0, -1).await?;

        Ok(Some(investor))
    }

    async fn register_investor(
        &self,
        address: &str,
        name: &str,
        campaign: &str,
    ) -> Result<Investor, StoreError> {
        let mut conn = self.connection.clone();

        let doc = Investor {
            address: address.to_string(),
            name: name.to_string(),
            invested_in: Vec::new(),
        };

        redis::pipe()
            .atomic()
            .hset_nx(INVESTORS_KEY, address, serde_json::to_string(&doc)?)
            .ignore()
            .rpush(invested_key(address), campaign)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        self.find_investor(address)
            .await?
            .ok_or_else(|| StoreError::Missing(format!("investor {address}")))
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();

        let doc = Vote {
            votes: Vec::new(),
            ..vote.clone()
        };

        let len: usize = conn
            .rpush(votes_key(&vote.campaign), serde_json::to_string(&doc)?)
            .await?;

        for ballot in &vote.votes {
            self.push_ballot(&vote.campaign, len - 1, ballot).await?;
        }

        Ok(())
    }

    async fn find_vote(
        &self,
        campaign: &str,
        stage: Option<i64>,
    ) -> Result<Option<Stored<Vote>>, StoreError> {
        let mut conn = self.connection.clone();

        let raw: Vec<String> = conn.lrange(votes_key(campaign), 0, -1).await?;
        let votes = raw
            .iter()
            .map(|raw| serde_json::from_str(raw))
            .collect::<Result<Vec<Vote>, _>>()?;

        let Some(mut stored) = first_vote(votes, stage) else {
            return Ok(None);
        };

        let raw: Vec<String> = conn.lrange(ballots_key(campaign, stored.slot), 0, -1).await?;
        stored.doc.votes = raw
            .iter()
            .map(|raw| serde_json::from_str(raw))
            .collect::<Result<Vec<Ballot>, _>>()?;

        Ok(Some(stored))
    }

    async fn push_ballot(
        &self,
        campaign: &str,
        slot: usize,
        ballot: &Ballot,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();

        conn.rpush::<_, _, ()>(ballots_key(campaign, slot), serde_json::to_string(ballot)?)
            .await?;

        Ok(())
    }

    async fn change_ballots(
        &self,
        campaign: &str,
        slot: usize,
        investor_address: &str,
        yes: bool,
    ) -> Result<usize, StoreError> {
        let mut conn = self.connection.clone();

        let changed: usize = self
            .change_ballots
            .key(ballots_key(campaign, slot))
            .arg(investor_address)
            .arg(if yes { "1" } else { "0" })
            .invoke_async(&mut conn)
            .await?;

        Ok(changed)
    }
}

#[derive(Default)]
struct Collections {
    campaigns: Vec<Campaign>,
    investors: HashMap<String, Investor>,
    votes: HashMap<String, Vec<Vote>>,
}

impl Collections {
    fn vote_mut(&mut self, campaign: &str, slot: usize) -> Result<&mut Vote, StoreError> {
        self.votes
            .get_mut(campaign)
            .and_then(|votes| votes.get_mut(slot))
            .ok_or_else(|| {
                warn!("No vote for campaign {campaign} at slot {slot}");
                StoreError::Missing(format!("vote {campaign} slot {slot}"))
            })
    }
}

/// Process-local store with the same lookup rules as [`RedisStore`]. Every write
/// happens under one lock, so it is as atomic as the Redis commands it stands in for.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn campaigns(&self) -> Vec<Campaign> {
        self.collections.lock().await.campaigns.clone()
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        self.collections.lock().await.campaigns.push(campaign.clone());

        Ok(())
    }

    async fn find_investor(&self, address: &str) -> Result<Option<Investor>, StoreError> {
        Ok(self.collections.lock().await.investors.get(address).cloned())
    }

    async fn register_investor(
        &self,
        address: &str,
        name: &str,
        campaign: &str,
    ) -> Result<Investor, StoreError> {
        let mut collections = self.collections.lock().await;

        let investor = collections
            .investors
            .entry(address.to_string())
            .or_insert_with(|| Investor {
                address: address.to_string(),
                name: name.to_string(),
                invested_in: Vec::new(),
            });
        investor.invested_in.push(campaign.to_string());

        Ok(investor.clone())
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        self.collections
            .lock()
            .await
            .votes
            .entry(vote.campaign.clone())
            .or_default()
            .push(vote.clone());

        Ok(())
    }

    async fn find_vote(
        &self,
        campaign: &str,
        stage: Option<i64>,
    ) -> Result<Option<Stored<Vote>>, StoreError> {
        let collections = self.collections.lock().await;

        Ok(collections
            .votes
            .get(campaign)
            .and_then(|votes| first_vote(votes.iter().cloned(), stage)))
    }

    async fn push_ballot(
        &self,
        campaign: &str,
        slot: usize,
        ballot: &Ballot,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;

        collections.vote_mut(campaign, slot)?.votes.push(ballot.clone());

        Ok(())
    }

    async fn change_ballots(
        &self,
        campaign: &str,
        slot: usize,
        investor_address: &str,
        yes: bool,
    ) -> Result<usize, StoreError> {
        let mut collections = self.collections.lock().await;

        let mut changed = 0;
        for ballot in collections
            .vote_mut(campaign, slot)?
            .votes
            .iter_mut()
            .filter(|ballot| ballot.investor_address == investor_address)
        {
            ballot.vote = yes;
            changed += 1;
        }

        Ok(changed)
    }
}
