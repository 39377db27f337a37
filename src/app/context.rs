use std::sync::Arc;

use crate::app::error::Result;
use crate::config::Config;
use crate::engine::{Pacer, RandomPacer, RunController};
use crate::sink::{build_media, build_sink, DeliverySink};

pub struct AppContext {
    pub config: Config,
    pub controller: Arc<RunController>,
    pub sink: Arc<dyn DeliverySink>,
    pub pacer: Arc<dyn Pacer>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_pacer(config, Arc::new(RandomPacer))
    }

    pub fn with_pacer(config: Config, pacer: Arc<dyn Pacer>) -> Result<Self> {
        let sink = build_sink(&config.delivery)?;
        let controller = Arc::new(
            RunController::new(config.engine_settings(), pacer.clone())
                .with_media(build_media(&config.delivery)?),
        );

        Ok(Self {
            config,
            controller,
            sink,
            pacer,
        })
    }
}
