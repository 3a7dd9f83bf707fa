use std::sync::Arc;

use crate::config::Config;
use crate::manager::DownloadManager;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manager: Arc<DownloadManager>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, manager: DownloadManager, metrics: Arc<Metrics>) -> Self {
        Self {
            config: Arc::new(config),
            manager: Arc::new(manager),
            metrics,
        }
    }
}
