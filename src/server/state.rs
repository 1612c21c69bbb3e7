use axum::extract::FromRef;

use crate::audio::AudioGenerator;
use crate::composer::Composer;
use crate::refiner::PromptRefiner;
use crate::usage::UsageLimiter;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedAudioGenerator = Arc<dyn AudioGenerator>;
pub type GuardedUsageLimiter = Arc<UsageLimiter>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub composer: Composer,
    pub refiner: PromptRefiner,
    pub audio: GuardedAudioGenerator,
    pub usage: GuardedUsageLimiter,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        composer: Composer,
        refiner: PromptRefiner,
        audio: GuardedAudioGenerator,
        usage: GuardedUsageLimiter,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_string(),
            composer,
            refiner,
            audio,
            usage,
        }
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for Composer {
    fn from_ref(input: &ServerState) -> Self {
        input.composer.clone()
    }
}

impl FromRef<ServerState> for PromptRefiner {
    fn from_ref(input: &ServerState) -> Self {
        input.refiner.clone()
    }
}

impl FromRef<ServerState> for GuardedAudioGenerator {
    fn from_ref(input: &ServerState) -> Self {
        input.audio.clone()
    }
}

impl FromRef<ServerState> for GuardedUsageLimiter {
    fn from_ref(input: &ServerState) -> Self {
        input.usage.clone()
    }
}
