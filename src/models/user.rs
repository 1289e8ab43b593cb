//! Caller identity carried by bearer tokens, and the capabilities it grants

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Something a caller may do to a reservation or asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateReservation,
    CancelOwn,
    Approve,
    Reject,
    ConfirmReceipt,
    ConfirmReturn,
    ManageAssets,
}

impl Capability {
    fn describe(&self) -> &'static str {
        match self {
            Capability::CreateReservation => "create reservations",
            Capability::CancelOwn => "cancel reservations",
            Capability::Approve => "approve reservations",
            Capability::Reject => "reject reservations",
            Capability::ConfirmReceipt => "confirm equipment receipt",
            Capability::ConfirmReturn => "confirm equipment return",
            Capability::ManageAssets => "manage assets",
        }
    }
}

/// Access tier assigned by the identity service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Requester,
    Custodian,
}

const REQUESTER_CAPABILITIES: &[Capability] =
    &[Capability::CreateReservation, Capability::CancelOwn];

const CUSTODIAN_CAPABILITIES: &[Capability] = &[
    Capability::Approve,
    Capability::Reject,
    Capability::ConfirmReceipt,
    Capability::ConfirmReturn,
    Capability::ManageAssets,
];

impl AccessTier {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            AccessTier::Requester => REQUESTER_CAPABILITIES,
            AccessTier::Custodian => CUSTODIAN_CAPABILITIES,
        }
    }
}

/// JWT claims for an authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub tier: AccessTier,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Sign claims into a token. Used by tests and tooling; the server never issues tokens.
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.tier.capabilities().contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Insufficient rights to {}",
                capability.describe()
            )))
        }
    }

    /// Custodians see every reservation, requesters only their own
    pub fn can_view_all_reservations(&self) -> bool {
        self.can(Capability::Approve)
    }
}
