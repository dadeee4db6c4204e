use std::sync::Arc;

use crate::config::Config;
use crate::db::store::Store;
use crate::middleware::auth::{create_permission_cache, PermissionCache};
use crate::services::cancellation::CancellationService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cancellations: CancellationService,
    pub config: Arc<Config>,
    pub permission_cache: PermissionCache,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let cancellations = CancellationService::new(store.clone(), config.fee_schedule);
        Self {
            store,
            cancellations,
            config: Arc::new(config),
            permission_cache: create_permission_cache(),
        }
    }
}
