use clap::Args;

use common::config::PipelineConfig;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Default log level written to the config
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Environment variable that holds the mailbox passphrase
    #[arg(long, default_value = "PASS_SHARE_PASSPHRASE")]
    pub passphrase_env: String,

    /// Tolerated clock skew for signature creation times, in seconds
    #[arg(long, default_value_t = 0)]
    pub clock_skew_secs: u64,

    /// Maximum number of shares opened at once
    #[arg(long, default_value_t = common::config::DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            log_level: self.log_level.clone(),
            passphrase_env: self.passphrase_env.clone(),
            pipeline: PipelineConfig {
                clock_skew_secs: self.clock_skew_secs,
                max_concurrency: self.max_concurrency,
                ..PipelineConfig::default()
            },
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized pass-share directory at: {}\n\
             - Config: {}\n\
             - Log level: {}\n\
             - Passphrase variable: {}\n\
             - Clock skew: {}s\n\
             - Max concurrency: {}",
            state.app_dir.display(),
            state.config_path.display(),
            state.config.log_level,
            state.config.passphrase_env,
            state.config.pipeline.clock_skew_secs,
            state.config.pipeline.max_concurrency,
        );

        Ok(output)
    }
}
