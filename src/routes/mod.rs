use crate::lifecycle::LifecycleManager;
use crate::store::Stores;

pub mod auth;
pub mod bookings;
pub mod cars;
pub mod notifications;
pub mod reservations;

/// Shared handler state: the repository bundle for reads and the
/// lifecycle manager for anything that transitions state.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub lifecycle: LifecycleManager,
}

impl AppState {
    pub fn new(stores: Stores) -> Self {
        let lifecycle = LifecycleManager::new(stores.clone());
        AppState { stores, lifecycle }
    }
}
