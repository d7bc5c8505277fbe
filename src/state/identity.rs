use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::dao::models::{random_base36, unix_millis};

/// Placeholder identity used before a guest id has been allocated.
const ANONYMOUS_GUEST: &str = "guest";

/// Identifier of an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pseudo-identity generated on the device before an account exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(String);

impl GuestId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Allocate a fresh `guest_<millis>_<suffix>` identifier.
    pub fn generate() -> Self {
        Self(format!(
            "guest_{}_{}",
            unix_millis(OffsetDateTime::now_utc()),
            random_base36(7)
        ))
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS_GUEST.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner of match records, decided once at the boundary.
///
/// `Local` data lives in device storage, `Remote` data in the user's rows of
/// the remote database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Local(GuestId),
    Remote(UserId),
}

impl Identity {
    pub fn is_remote(&self) -> bool {
        matches!(self, Identity::Remote(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Local(guest) => write!(f, "local:{guest}"),
            Identity::Remote(user) => write!(f, "remote:{user}"),
        }
    }
}

/// Identity and entitlement of whoever is using the app right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: Option<UserId>,
    pub guest_id: Option<GuestId>,
    /// Pro-tier entitlement as reported by the payment provider.
    pub is_pro: bool,
}

impl Session {
    /// Routing identity: an authenticated user always wins over a guest id.
    pub fn identity(&self) -> Identity {
        match (&self.user_id, &self.guest_id) {
            (Some(user), _) => Identity::Remote(user.clone()),
            (None, Some(guest)) => Identity::Local(guest.clone()),
            (None, None) => Identity::Local(GuestId::anonymous()),
        }
    }
}
