//! The execution context threaded through a request's call tree.

use std::sync::Arc;

use uuid::Uuid;

use crate::context::identity::Identity;
use crate::context::scope::ScopeHandle;
use crate::errors::AppError;
use crate::observability::event_codes::*;
use crate::observability::logging::{LogEvent, LogField, StructuredLogger};

/// Correlation ID, identity, transactional scope, action name and a logger
/// carrying all of them as fixed fields.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    correlation_id: Arc<str>,
    action: Arc<str>,
    identity: Option<Arc<Identity>>,
    scope: Option<ScopeHandle>,
    logger: StructuredLogger,
}

impl ExecutionContext {
    /// Build a root context.
    ///
    /// A missing or blank `correlation_id` is replaced with a fresh UUID.
    /// Identity fields are stamped before `action` and `correlationId`; log
    /// consumers depend on that order.
    pub fn new(
        identity: Option<Arc<Identity>>,
        scope: Option<ScopeHandle>,
        correlation_id: Option<&str>,
        action: &str,
        base: &StructuredLogger,
    ) -> Self {
        let correlation_id = match correlation_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let mut fields = Vec::with_capacity(7);
        if let Some(identity) = identity.as_deref() {
            fields.push(LogField::str(FIELD_TENANT_ID, identity.tenant_id.to_string()));
            fields.push(LogField::str(FIELD_USER_ID, identity.user_id.to_string()));
            fields.push(LogField::str(FIELD_USER_NAME, identity.user_name.as_str()));
            fields.push(LogField::str(FIELD_TENANT_NAME, identity.tenant_name.as_str()));
            fields.push(LogField::str(FIELD_DISPLAY_NAME, identity.display_name.as_str()));
        }
        fields.push(LogField::str(FIELD_ACTION, action));
        fields.push(LogField::str(FIELD_CORRELATION_ID, correlation_id.as_str()));

        Self {
            correlation_id: Arc::from(correlation_id),
            action: Arc::from(action),
            identity,
            scope,
            logger: base.with_fields(fields),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_deref()
    }

    pub fn scope(&self) -> Option<&ScopeHandle> {
        self.scope.as_ref()
    }

    /// Replace the scope on this node only.
    pub fn set_scope(&mut self, scope: Option<ScopeHandle>) {
        self.scope = scope;
    }

    /// The logger with every field accumulated down to this node.
    pub fn default_logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Add fields to this node's logger. Children derived earlier are not
    /// affected.
    pub fn add_logger_fields(&mut self, fields: &[(&str, &str)]) {
        self.logger = self.logger.with_fields(to_fields(fields));
    }

    /// Child with the same identity and scope.
    pub fn derive(&self, fields: &[(&str, &str)]) -> Self {
        self.branch(self.identity.clone(), self.scope.clone(), fields)
    }

    /// Child running as a different identity.
    pub fn derive_with_identity(&self, identity: Option<Arc<Identity>>, fields: &[(&str, &str)]) -> Self {
        self.branch(identity, self.scope.clone(), fields)
    }

    pub fn derive_with_identity_and_scope(
        &self,
        identity: Option<Arc<Identity>>,
        scope: Option<ScopeHandle>,
        fields: &[(&str, &str)],
    ) -> Self {
        self.branch(identity, scope, fields)
    }

    /// Child bound to a different unit of work.
    pub fn derive_with_scope(&self, scope: Option<ScopeHandle>, fields: &[(&str, &str)]) -> Self {
        self.branch(self.identity.clone(), scope, fields)
    }

    fn branch(
        &self,
        identity: Option<Arc<Identity>>,
        scope: Option<ScopeHandle>,
        fields: &[(&str, &str)],
    ) -> Self {
        Self {
            correlation_id: Arc::clone(&self.correlation_id),
            action: Arc::clone(&self.action),
            identity,
            scope,
            logger: self.logger.with_fields(to_fields(fields)),
        }
    }

    /// Logger tagged with an event type and code.
    pub fn logger(&self, event_type: &str, event_code: &str) -> StructuredLogger {
        self.logger.with_fields([
            LogField::str(FIELD_EVENT_TYPE, event_type),
            LogField::str(FIELD_EVENT_CODE, event_code),
        ])
    }

    /// Info event pre-tagged as a successful action completion.
    pub fn log_action_completion(&self) -> LogEvent {
        self.logger
            .info()
            .str(FIELD_EVENT_TYPE, EVENT_TYPE_SUCCESS)
            .str(FIELD_EVENT_CODE, EVENT_CODE_ACTION_COMPLETE)
    }

    /// Log `err` once, with severity and fields chosen by its kind.
    ///
    /// Validation errors always log [`MESSAGE_INVALID_INPUT_DATA`]; `message`
    /// is ignored for them so caller input never reaches the log line.
    pub fn log_error(&self, err: &AppError, message: &str) {
        match err {
            AppError::Validation { .. } => self
                .logger(EVENT_TYPE_VALIDATION_ERR, EVENT_CODE_INVALID_DATA)
                .info()
                .err(err)
                .msg(MESSAGE_INVALID_INPUT_DATA),
            AppError::ResourceNotFound {
                key,
                resource_name,
                resource_value,
            } => self
                .logger(EVENT_TYPE_UNEXPECTED_ERR, key)
                .debug()
                .err(err)
                .str("resourceName", resource_name.as_str())
                .str("resourceValue", resource_value.as_str())
                .msg(message),
            AppError::ApiClient {
                code,
                url,
                stack,
                status,
                body,
                ..
            } => {
                let mut event = self
                    .logger(EVENT_TYPE_UNEXPECTED_ERR, code)
                    .error()
                    .err(err)
                    .str("stack", stack.as_str())
                    .str("apiURL", url.as_str());
                if let Some(body) = body {
                    event = event.str("responseBody", body.as_str());
                }
                if let Some(status) = status {
                    event = event.int("responseStatusCode", i64::from(*status));
                }
                event.msg(message);
            }
            AppError::Unexpected { code, stack, .. } => self
                .logger(EVENT_TYPE_UNEXPECTED_ERR, code)
                .error()
                .err(err)
                .str("stack", stack.as_str())
                .msg(message),
            AppError::Other(_) => self
                .logger(EVENT_TYPE_UNEXPECTED_ERR, EVENT_CODE_UNKNOWN)
                .error()
                .err(err)
                .msg(message),
        }
    }

    /// Log a request payload that failed to parse.
    pub fn log_json_parse_error(&self, err: &AppError) {
        self.log_error(err, MESSAGE_PARSE_ERROR);
    }
}

fn to_fields(fields: &[(&str, &str)]) -> Vec<LogField> {
    fields.iter().map(|(k, v)| LogField::str(*k, *v)).collect()
}
