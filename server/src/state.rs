use std::sync::Arc;

use crate::{
    config::Config,
    database::{RedisStore, VoteStore, init_redis},
    error::AppError,
    service::VotingService,
};

pub struct State {
    pub config: Config,
    pub voting: VotingService,
}

impl State {
    pub async fn new() -> Result<Arc<Self>, AppError> {
        let config = Config::load()?;

        let redis_connection = init_redis(&config.redis_url).await?;

        Ok(Self::with_store(config, Arc::new(RedisStore::new(redis_connection))))
    }

    pub fn with_store(config: Config, store: Arc<dyn VoteStore>) -> Arc<Self> {
        let voting = VotingService::new(store, config.vote_window_hours);

        Arc::new(Self { config, voting })
    }
}
