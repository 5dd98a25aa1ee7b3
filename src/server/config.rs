use super::RequestsLoggingLevel;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Metrics are served on their own port; `None` disables them.
    pub metrics_port: Option<u16>,
    /// `s-maxage` sent with rendered widgets.
    pub cache_max_age_sec: u32,
    /// Fixed seed for every render, for reproducible output.
    pub render_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3000,
            metrics_port: None,
            cache_max_age_sec: 1,
            render_seed: None,
        }
    }
}
