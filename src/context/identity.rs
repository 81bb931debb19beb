//! Authenticated principal carried by an execution context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant and user a unit of work runs on behalf of.
///
/// Token parsing happens elsewhere; this is the already-validated view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub tenant_name: String,
    pub display_name: String,
    pub admin: bool,
    /// Raw token, forwarded on outbound calls.
    #[serde(default, skip_serializing)]
    pub raw: String,
}

impl Identity {
    /// Identity used for background and bootstrap work.
    pub fn system(admin: bool) -> Self {
        Self {
            tenant_id: Uuid::nil(),
            user_id: Uuid::nil(),
            user_name: "System".to_string(),
            tenant_name: "None".to_string(),
            display_name: "System".to_string(),
            admin,
            raw: String::new(),
        }
    }

    /// Identity assembled by the caller rather than taken from a token.
    pub fn custom(tenant_id: Uuid, user_id: Uuid, user_name: impl Into<String>, admin: bool) -> Self {
        Self {
            tenant_id,
            user_id,
            user_name: user_name.into(),
            tenant_name: String::new(),
            display_name: String::new(),
            admin,
            raw: String::new(),
        }
    }
}
