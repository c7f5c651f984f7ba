//! Caller identity from the authentication collaborator's headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{CustomerId, ProducerId};
use domain::Actor;

use crate::error::ApiError;

/// Verified user id, set by the authentication layer in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// `customer` or `producer`.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = uuid::Uuid::parse_str(header(parts, USER_ID_HEADER)?)
            .map_err(|e| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER}: {e}")))?;

        let actor = match header(parts, USER_ROLE_HEADER)? {
            "customer" => Actor::Customer(CustomerId::from_uuid(id)),
            "producer" => Actor::Producer(ProducerId::from_uuid(id)),
            other => {
                return Err(ApiError::Unauthorized(format!(
                    "unknown role {other:?}, expected customer or producer"
                )));
            }
        };

        Ok(Caller(actor))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(headers: &[(&str, &str)]) -> Result<Caller, ApiError> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_customer_identity() {
        let id = uuid::Uuid::new_v4();
        let caller = extract(&[
            (USER_ID_HEADER, &id.to_string()),
            (USER_ROLE_HEADER, "customer"),
        ])
        .await
        .unwrap();
        assert_eq!(caller.0, Actor::Customer(CustomerId::from_uuid(id)));
    }

    #[tokio::test]
    async fn test_missing_or_bad_headers_are_unauthorized() {
        assert!(matches!(
            extract(&[(USER_ROLE_HEADER, "producer")]).await,
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            extract(&[(USER_ID_HEADER, "42"), (USER_ROLE_HEADER, "producer")]).await,
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            extract(&[
                (USER_ID_HEADER, &uuid::Uuid::new_v4().to_string()),
                (USER_ROLE_HEADER, "admin"),
            ])
            .await,
            Err(ApiError::Unauthorized(_))
        ));
    }
}
