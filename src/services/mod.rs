//! Business logic services

pub mod assets;
pub mod lifecycle;
pub mod notifications;

use std::sync::Arc;

use crate::{lifecycle::ReferenceCalendar, repository::CustodyStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub assets: assets::AssetsService,
    pub lifecycle: lifecycle::LifecycleService,
}

impl Services {
    /// Create all services on top of the given store
    pub fn new(
        store: Arc<dyn CustodyStore>,
        calendar: ReferenceCalendar,
        notifier: notifications::Notifier,
    ) -> Self {
        Self {
            assets: assets::AssetsService::new(store.clone()),
            lifecycle: lifecycle::LifecycleService::new(store, calendar, notifier),
        }
    }
}
