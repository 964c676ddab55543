use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, store::RecordStore, utils::jwt::RevokedTokens};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Config,
    pub revoked: RevokedTokens,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Config) -> Self {
        Self {
            store,
            config,
            revoked: RevokedTokens::default(),
        }
    }
}

impl FromRef<AppState> for Arc<dyn RecordStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for RevokedTokens {
    fn from_ref(state: &AppState) -> Self {
        state.revoked.clone()
    }
}
