//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation ID
//! - [`Identity`]: the caller's user ID and role, taken from trusted headers
//! - [`ApiJson`]: a JSON body whose rejections render as [`AppError`]
//!
//! Authentication happens upstream (a gateway or session layer). The portal
//! trusts `X-User-Id` and `X-User-Role` as set by that layer.
//!
//! # Examples
//!
//! ```ignore
//! use campus_web::extractors::{CorrelationId, Identity};
//!
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     caller: Identity<Role>,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(
//!         correlation_id = %correlation_id.0,
//!         user_id = %caller.user_id,
//!         "Processing request"
//!     );
//!     Ok(Json(response))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use std::str::FromStr;
use uuid::Uuid;

/// Header carrying the authenticated user ID.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Correlation ID for request tracing.
///
/// Prefers the ID stored by the correlation middleware, then the
/// `X-Correlation-ID` header, and generates a UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts.extensions.get::<Uuid>().copied().unwrap_or_else(|| {
            parts
                .headers
                .get(CORRELATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_else(Uuid::new_v4)
        });

        Ok(Self(correlation_id))
    }
}

/// Authenticated caller.
///
/// `R` is the domain's role type, parsed from `X-User-Role`.
///
/// # Rejections
///
/// - 401 when either header is missing or blank
/// - 400 when the role is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity<R> {
    /// Stable user identifier (a roll number for students)
    pub user_id: String,
    /// The caller's role
    pub role: R,
}

#[async_trait]
impl<S, R> FromRequestParts<S> for Identity<R>
where
    S: Send + Sync,
    R: FromStr + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized(format!("Missing {USER_ID_HEADER} header")))?;
        let raw_role = header(USER_ROLE_HEADER)
            .ok_or_else(|| AppError::unauthorized(format!("Missing {USER_ROLE_HEADER} header")))?;

        let role = raw_role
            .parse::<R>()
            .map_err(|_| AppError::bad_request(format!("Unknown role '{raw_role}'")))?;

        Ok(Self { user_id, role })
    }
}

/// JSON request body.
///
/// Behaves like [`axum::Json`] but malformed bodies, unknown enum strings and
/// missing fields are answered with a 400 `BAD_REQUEST` in the usual
/// `{code, message}` shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(&rejection)),
        }
    }
}

fn json_rejection(rejection: &JsonRejection) -> AppError {
    AppError::bad_request(rejection.body_text()).with_code("INVALID_BODY")
}
