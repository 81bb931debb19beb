//! Event types, event codes and fixed messages stamped on structured logs.

pub const EVENT_TYPE_SUCCESS: &str = "SUCCESS";
pub const EVENT_TYPE_VALIDATION_ERR: &str = "VALIDATION_ERROR";
pub const EVENT_TYPE_UNEXPECTED_ERR: &str = "UNEXPECTED_ERROR";

pub const EVENT_CODE_ACTION_COMPLETE: &str = "ACTION_COMPLETE";
pub const EVENT_CODE_INVALID_DATA: &str = "INVALID_DATA";
pub const EVENT_CODE_UNKNOWN: &str = "UNKNOWN";

/// Logged for every validation failure; caller-supplied text is never used.
pub const MESSAGE_INVALID_INPUT_DATA: &str = "Invalid input data";
pub const MESSAGE_PARSE_ERROR: &str = "Unable to parse request payload";

// Field keys consumed by downstream log pipelines.
pub const FIELD_TENANT_ID: &str = "tenantId";
pub const FIELD_USER_ID: &str = "userId";
pub const FIELD_USER_NAME: &str = "username";
pub const FIELD_TENANT_NAME: &str = "tenantName";
pub const FIELD_DISPLAY_NAME: &str = "userDisplayName";
pub const FIELD_ACTION: &str = "action";
pub const FIELD_CORRELATION_ID: &str = "correlationId";
pub const FIELD_EVENT_TYPE: &str = "eventType";
pub const FIELD_EVENT_CODE: &str = "eventCode";
