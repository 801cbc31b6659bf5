use std::sync::Arc;

use catalog_dal::Pool;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool) -> Self {
        AppState {
            state: Arc::new(AppStateInner { app_config, pool }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum accepted size of a submitted form.
    pub body_limit_kb: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig { body_limit_kb: 64 }
    }
}
