use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Explicit actor context threaded through every service call.
///
/// Session bootstrap lives upstream; the gateway forwards the resolved
/// identity in headers. Nothing in this crate reads ambient/global request
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    pub tenant_id: i64,
    pub user_id: i64,
    pub role_key: String,
    /// Actors holding the all-branches capability bypass per-branch
    /// visibility grants.
    pub all_branches: bool,
}

impl OperationContext {
    pub fn new(tenant_id: i64, user_id: i64, role_key: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user_id,
            role_key: role_key.into(),
            all_branches: false,
        }
    }

    pub fn with_all_branches(mut self) -> Self {
        self.all_branches = true;
        self
    }
}

fn header_i64(parts: &Parts, name: &str) -> Result<i64, ServiceError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| ServiceError::Unauthorized(format!("missing or invalid {name} header")))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for OperationContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = header_i64(parts, "x-tenant-id")?;
        let user_id = header_i64(parts, "x-user-id")?;
        let role_key = parts
            .headers
            .get("x-role")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Unauthorized("missing x-role header".into()))?;
        let all_branches = parts
            .headers
            .get("x-all-branches")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(OperationContext {
            tenant_id,
            user_id,
            role_key,
            all_branches,
        })
    }
}
