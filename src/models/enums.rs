//! Shared domain enums, stored as text columns

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Implements string conversions and SQLx text mapping for a fieldless enum.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("Invalid {} value: {}", stringify!($ty), other)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// AssetStatus
// ---------------------------------------------------------------------------

/// Custody status of an asset. Only the lifecycle coordinator changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Available,
    Reserved,
    InUse,
    Maintenance,
    OutOfService,
}

text_enum!(AssetStatus {
    Available => "available",
    Reserved => "reserved",
    InUse => "in_use",
    Maintenance => "maintenance",
    OutOfService => "out_of_service",
});

// ---------------------------------------------------------------------------
// ReservationStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

text_enum!(ReservationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Cancelled => "cancelled",
    Completed => "completed",
});

impl ReservationStatus {
    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Rejected | ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Self-reported state of an item at a custody transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Good,
    Damage,
}

text_enum!(Condition {
    Good => "good",
    Damage => "damage",
});

// ---------------------------------------------------------------------------
// CustodyEvent
// ---------------------------------------------------------------------------

/// The two custody-transfer events where condition is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CustodyEvent {
    Receipt,
    Return,
}

text_enum!(CustodyEvent {
    Receipt => "receipt",
    Return => "return",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_roundtrip() {
        assert_eq!("in_use".parse::<AssetStatus>(), Ok(AssetStatus::InUse));
        assert_eq!(AssetStatus::OutOfService.as_str(), "out_of_service");
        assert_eq!(ReservationStatus::Cancelled.to_string(), "cancelled");
        assert!("lost".parse::<Condition>().is_err());
    }

    #[test]
    fn test_serde_matches_text() {
        let json = serde_json::to_string(&AssetStatus::InUse).unwrap();
        assert_eq!(json, "\"in_use\"");
        let status: ReservationStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(status, ReservationStatus::Approved);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(!ReservationStatus::Approved.is_terminal());
        assert!(ReservationStatus::Rejected.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Completed.is_terminal());
    }
}
