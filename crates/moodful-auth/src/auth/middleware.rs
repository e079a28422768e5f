//! Owner guard middleware for axum routes
//!
//! Routes guarded by [`owner_guard`] must carry a `{user_id}` path parameter.
//! On success the caller's [`Identity`] is available to the handler as a
//! request extension.

use std::collections::HashMap;
use std::sync::Arc;

use axum::RequestExt;
use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::authenticator::{Identity, RequestAuthenticator};
use super::error::unauthorized_response;

/// Path parameter holding the owner id of the addressed resource
pub const OWNER_PATH_PARAM: &str = "user_id";

/// Authentication state for middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    pub authenticator: Arc<RequestAuthenticator>,
}

impl AuthState {
    #[must_use]
    pub const fn new(authenticator: Arc<RequestAuthenticator>) -> Self {
        Self { authenticator }
    }
}

/// Reject the request with 401 unless its bearer token belongs to the owner
/// named in the path.
#[allow(clippy::future_not_send)]
pub async fn owner_guard(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let owner = match request.extract_parts::<Path<HashMap<String, String>>>().await {
        Ok(Path(mut params)) => params.remove(OWNER_PATH_PARAM),
        Err(e) => {
            tracing::error!(error = %e, "Owner guard could not read path parameters");
            None
        }
    };
    let Some(owner) = owner else {
        tracing::error!(
            path = %request.uri().path(),
            "Owner guard applied to a route without a '{OWNER_PATH_PARAM}' parameter"
        );
        return unauthorized_response();
    };

    let Some(identity) = state
        .authenticator
        .owner_identity(request.headers(), &owner)
        .await
    else {
        #[cfg(feature = "metrics")]
        crate::observability::record_verdict("unauthenticated");
        return unauthorized_response();
    };

    #[cfg(feature = "metrics")]
    crate::observability::record_verdict("authenticated");

    request.extensions_mut().insert::<Identity>(identity);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::routing::get;
    use axum::{Extension, middleware};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::testing::{self, FakeRetriever, TestClaims, TestKey};

    async fn whoami(Extension(identity): Extension<Identity>) -> String {
        identity.subject().unwrap_or("debug").to_string()
    }

    fn router(retriever: &Arc<FakeRetriever>, debug: bool) -> Router {
        let options = testing::options().with_debug(debug);
        let authenticator = RequestAuthenticator::new(Arc::new(options), testing::cache(retriever));
        let state = AuthState::new(Arc::new(authenticator));

        Router::new()
            .route("/users/{user_id}/reviews", get(whoami))
            .route("/unowned", get(whoami))
            .route_layer(middleware::from_fn_with_state(state, owner_guard))
    }

    fn request(uri: &str, token: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_owner_passes_guard() {
        let retriever = Arc::new(FakeRetriever::new(vec![testing::current_jwk()]));
        let token = testing::sign(TestKey::Current, &TestClaims::valid("user-42"));

        let response = router(&retriever, false)
            .oneshot(request("/users/user-42/reviews", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "user-42");
    }

    #[tokio::test]
    async fn test_other_owner_is_rejected() {
        let retriever = Arc::new(FakeRetriever::new(vec![testing::current_jwk()]));
        let token = testing::sign(TestKey::Current, &TestClaims::valid("user-42"));

        let response = router(&retriever, false)
            .oneshot(request("/users/user-99/reviews", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let retriever = Arc::new(FakeRetriever::new(vec![testing::current_jwk()]));

        let response = router(&retriever, false)
            .oneshot(request("/users/user-42/reviews", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(retriever.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_route_without_owner_is_rejected() {
        let retriever = Arc::new(FakeRetriever::new(vec![testing::current_jwk()]));
        let token = testing::sign(TestKey::Current, &TestClaims::valid("user-42"));

        let response = router(&retriever, false)
            .oneshot(request("/unowned", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_debug_mode_passes_without_token() {
        let retriever = Arc::new(FakeRetriever::new(vec![testing::current_jwk()]));

        let response = router(&retriever, true)
            .oneshot(request("/users/user-99/reviews", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "debug");
    }
}
