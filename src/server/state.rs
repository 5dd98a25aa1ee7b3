use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use super::params::WidgetDefaults;
use super::ServerConfig;
use crate::pipeline::WidgetPipeline;

pub type GuardedPipeline = Arc<WidgetPipeline>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub pipeline: GuardedPipeline,
    pub widget_defaults: WidgetDefaults,
}

impl FromRef<ServerState> for GuardedPipeline {
    fn from_ref(input: &ServerState) -> Self {
        input.pipeline.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for WidgetDefaults {
    fn from_ref(input: &ServerState) -> Self {
        input.widget_defaults.clone()
    }
}
