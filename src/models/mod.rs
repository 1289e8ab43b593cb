//! Data models for Custodian

pub mod asset;
pub mod enums;
pub mod reservation;
pub mod user;

// Re-export commonly used types
pub use asset::{Asset, AssetQuery, CreateAsset, UpdateAsset};
pub use enums::{AssetStatus, Condition, CustodyEvent, ReservationStatus};
pub use reservation::{
    ConditionRecord, ConditionReport, CreateReservation, CustodyOutcome, NewConditionRecord,
    NewReservation, Reservation, ReservationDetails, ReservationQuery,
};
pub use user::{AccessTier, Capability, UserClaims};
