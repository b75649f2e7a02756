use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::session::OrchestratorConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub streaming: StreamingLimits,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Where and how to reach the recognition engine
#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Deadline for the engine to accept a new stream
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Deadline for the engine's first response on an open stream
    #[serde(default = "default_first_result_timeout_secs")]
    pub first_result_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            first_result_timeout_secs: default_first_result_timeout_secs(),
        }
    }
}

/// Per-session queue bounds and teardown deadline
#[derive(Debug, Deserialize)]
pub struct StreamingLimits {
    #[serde(default = "default_audio_queue_depth")]
    pub audio_queue_depth: usize,

    #[serde(default = "default_result_queue_depth")]
    pub result_queue_depth: usize,

    /// How long end-of-session waits for the engine to finish draining
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for StreamingLimits {
    fn default() -> Self {
        Self {
            audio_queue_depth: default_audio_queue_depth(),
            result_queue_depth: default_result_queue_depth(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Orchestrator tunables derived from the engine and streaming sections
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            audio_queue_depth: self.streaming.audio_queue_depth,
            result_queue_depth: self.streaming.result_queue_depth,
            drain_timeout: Duration::from_secs(self.streaming.drain_timeout_secs),
            engine_connect_timeout: Duration::from_secs(self.engine.connect_timeout_secs),
            engine_first_result_timeout: Duration::from_secs(
                self.engine.first_result_timeout_secs,
            ),
        }
    }
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_first_result_timeout_secs() -> u64 {
    15
}

fn default_audio_queue_depth() -> usize {
    32
}

fn default_result_queue_depth() -> usize {
    64
}

fn default_drain_timeout_secs() -> u64 {
    5
}
