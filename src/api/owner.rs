use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::response::ApiError;

/// Header carrying the account id, set by the authenticating gateway in front
/// of this service.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Already-authenticated identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| OwnerId(v.to_string()))
            .ok_or_else(|| ApiError::unauthorized("Missing authenticated owner"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(header: Option<&str>) -> Result<OwnerId, ApiError> {
        let mut builder = Request::builder().uri("/files");
        if let Some(value) = header {
            builder = builder.header(OWNER_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        OwnerId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_owner_from_header() {
        let owner = extract(Some(" acct-42 ")).await.unwrap();
        assert_eq!(owner.as_str(), "acct-42");
    }

    #[tokio::test]
    async fn test_missing_or_blank_owner_is_unauthorized() {
        for header in [None, Some(""), Some("   ")] {
            let err = extract(header).await.unwrap_err();
            assert!(matches!(err, ApiError::Fail(code, _) if code == StatusCode::UNAUTHORIZED));
        }
    }
}
