//! Asset status derivation

use crate::models::{AssetStatus, Condition};

/// Transitions that move an asset's custody status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Approved,
    Received,
    Returned(Condition),
    /// Return confirmed on a reservation that was never picked up
    Released(Condition),
    MaintenanceCompleted,
    Retired,
}

/// Status of an asset after `event` is applied to an asset in `current`.
///
/// OutOfService is terminal. Rejections and cancellations never reach here:
/// they leave the asset untouched.
pub fn next_status(current: AssetStatus, event: StatusEvent) -> AssetStatus {
    if current == AssetStatus::OutOfService {
        return current;
    }
    match event {
        StatusEvent::Approved => match current {
            AssetStatus::Available => AssetStatus::Reserved,
            other => other,
        },
        StatusEvent::Received => AssetStatus::InUse,
        StatusEvent::Returned(Condition::Good) => AssetStatus::Available,
        StatusEvent::Returned(Condition::Damage) => AssetStatus::Maintenance,
        // Only the reservation's own hold is released; someone else's custody is left alone
        StatusEvent::Released(condition) => match (current, condition) {
            (AssetStatus::Reserved, Condition::Good) => AssetStatus::Available,
            (AssetStatus::Reserved | AssetStatus::Available, Condition::Damage) => {
                AssetStatus::Maintenance
            }
            (other, _) => other,
        },
        StatusEvent::MaintenanceCompleted => AssetStatus::Available,
        StatusEvent::Retired => AssetStatus::OutOfService,
    }
}
