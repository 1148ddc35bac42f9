use std::sync::Arc;

use crate::auth::AuthSettings;
use crate::store::CatalogStore;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub auth: Arc<AuthSettings>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, auth: AuthSettings) -> Self {
        AppState {
            store,
            auth: Arc::new(auth),
        }
    }
}
