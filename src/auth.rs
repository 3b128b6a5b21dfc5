//! # Caller Identity
//!
//! Users are authenticated by the upstream gateway, which forwards who they are
//! in `X-User-Id`, `X-User-Role` and `X-User-Email`. The middleware here turns
//! those headers into a [`Caller`] request extension for handlers to extract.

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, forbidden, unauthorized, validation_error};

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Agent,
    Admin,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "user" => Some(Role::User),
            "agent" => Some(Role::Agent),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }
}

/// Authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
    pub email: Option<String>,
}

impl Caller {
    /// Agents and admins work tickets on behalf of support.
    pub fn is_privileged(&self) -> bool {
        matches!(self.role, Role::Agent | Role::Admin)
    }

    /// True when the caller may see `owner`'s tickets.
    pub fn can_access(&self, owner: Uuid) -> bool {
        self.is_privileged() || self.user_id == owner
    }

    pub fn require_privileged(&self) -> Result<(), ApiError> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(forbidden(Some("Only support agents may perform this action")))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(forbidden(Some("Only administrators may perform this action")))
        }
    }
}

/// Middleware that resolves the caller from gateway headers.
pub async fn caller_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let caller = caller_from_headers(request.headers())?;
    tracing::debug!(user_id = %caller.user_id, role = caller.role.as_str(), "Resolved caller");

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(name)
        .map(|value| {
            value.to_str().map_err(|_| {
                validation_error(
                    "Invalid caller header",
                    serde_json::json!({ (name): "Header must be valid UTF-8" }),
                )
            })
        })
        .transpose()
}

fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let user_id = header_str(headers, USER_ID_HEADER)?
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| unauthorized(Some("Missing X-User-Id header")))?;

    let user_id = user_id
        .parse::<Uuid>()
        .ok()
        .filter(|id| !id.is_nil())
        .ok_or_else(|| {
            validation_error(
                "Invalid user ID",
                serde_json::json!({ (USER_ID_HEADER): "Must be a non-nil UUID" }),
            )
        })?;

    let role = match header_str(headers, USER_ROLE_HEADER)? {
        Some(value) => Role::parse(value).ok_or_else(|| {
            validation_error(
                "Invalid user role",
                serde_json::json!({ (USER_ROLE_HEADER): "Must be one of user, agent, admin" }),
            )
        })?,
        None => Role::User,
    };

    let email = header_str(headers, USER_EMAIL_HEADER)?
        .map(str::trim)
        .filter(|value| value.contains('@'))
        .map(str::to_string);

    Ok(Caller {
        user_id,
        role,
        email,
    })
}

/// OpenAPI header parameters describing the caller
#[derive(Debug, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Header)]
pub struct CallerHeaders {
    /// Authenticated user (UUID) forwarded by the gateway
    #[serde(rename = "X-User-Id")]
    #[param(rename = "X-User-Id", value_type = String)]
    pub user_id: String,
    /// `user` (default), `agent` or `admin`
    #[serde(rename = "X-User-Role")]
    #[param(rename = "X-User-Role", value_type = Option<String>)]
    pub role: Option<String>,
    /// Contact address used for ticket notifications
    #[serde(rename = "X-User-Email")]
    #[param(rename = "X-User-Email", value_type = Option<String>)]
    pub email: Option<String>,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Caller identity missing")))
    }
}
