//! Shared application state for all routes. Built explicitly in `main` and cloned per request.

use crate::config::Settings;
use crate::db::Engine;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub engine: Engine,
}

impl AppState {
    pub fn new(settings: Settings, engine: Engine) -> Self {
        AppState {
            settings: Arc::new(settings),
            engine,
        }
    }
}
