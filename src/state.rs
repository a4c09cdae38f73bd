use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::storage::ObjectStore;

/// Shared application state. Both external collaborators are injected
/// capabilities so workflows can run against fakes in tests.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, store: Arc<dyn ObjectStore>) -> Self {
        Self { db, store }
    }
}
