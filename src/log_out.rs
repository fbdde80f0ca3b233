//! This file defines the handler for log-out requests.

use axum::{Json, response::IntoResponse, response::Response};
use axum_extra::extract::PrivateCookieJar;
use serde_json::json;

use crate::auth::invalidate_auth_cookie;

/// Handler for log-out requests.
///
/// Invalidates the auth cookie. Safe to call when not logged in.
pub async fn get_log_out(jar: PrivateCookieJar) -> Response {
    (
        invalidate_auth_cookie(jar),
        Json(json!({ "logged_out": true })),
    )
        .into_response()
}

#[cfg(test)]
mod log_out_tests {
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use time::OffsetDateTime;

    use crate::{
        auth::COOKIE_USER_ID,
        endpoints,
        test_utils::new_test_state,
    };

    use super::get_log_out;

    #[tokio::test]
    async fn log_out_invalidates_the_auth_cookie() {
        let state = new_test_state();
        let app = Router::new()
            .route(endpoints::LOG_OUT, get(get_log_out))
            .with_state(state);
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server.get(endpoints::LOG_OUT).await;

        response.assert_status_ok();
        let cookie = response.cookie(COOKIE_USER_ID);
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
    }
}
