use std::sync::Arc;

use crate::{config::Config, db::GradingStore};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GradingStore>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<dyn GradingStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

