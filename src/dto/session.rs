use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::identity::Session;

/// Who is using the app and where their matches live.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: Option<String>,
    pub guest_id: Option<String>,
    pub is_pro: bool,
    /// `local` or `remote`.
    pub storage: String,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        let storage = if session.identity().is_remote() {
            "remote"
        } else {
            "local"
        };
        Self {
            user_id: session.user_id.as_ref().map(ToString::to_string),
            guest_id: session.guest_id.as_ref().map(ToString::to_string),
            is_pro: session.is_pro,
            storage: storage.to_owned(),
        }
    }
}

/// Switch the session to an account authenticated by the external provider.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    /// Move guest matches into the account before switching.
    #[serde(default)]
    pub migrate_guest_data: bool,
}

/// Outcome of a sign-in.
#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
    pub session: SessionResponse,
    /// Matches moved from the device into the account.
    pub migrated: usize,
    /// Migrated matches whose local copy could not be removed.
    pub leftover: usize,
    /// Identifier of the in-progress match resumed after sign-in.
    pub restored_match_id: Option<String>,
}

/// Entitlement reported by the payment provider.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EntitlementRequest {
    pub is_pro: bool,
}
