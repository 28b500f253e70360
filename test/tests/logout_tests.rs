//! User-initiated logout: local session teardown first, then the CAS
//! server leg.

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};

use actix_cas_core::http::cas::{AuthEventType, CasSettings};
use common::*;

#[actix_web::test]
async fn test_logout_ends_local_session_and_bounces_to_cas() {
    let (app, harness) = create_test_app(enabled_settings()).await;
    harness.seed_active_user("alice").await;
    harness.issue_ticket("ST-1", "alice").await;

    let resp =
        test::call_service(&app, TestRequest::get().uri("/cas?ticket=ST-1").to_request()).await;
    let cookie = session_cookie(&resp);

    let resp = test::call_service(
        &app,
        TestRequest::get().uri("/logout").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let target = location(&resp);
    assert!(target.starts_with("https://cas.example.com/logout?service="));
    assert!(target.contains("http%3A%2F%2Flocalhost%3A8080%2F"));

    // the response clears the session cookie; the cleared state carries
    // no actor anymore
    let cleared = session_cookie(&resp);
    let resp = test::call_service(
        &app,
        TestRequest::get().uri("/my/account").cookie(cleared).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(harness.events.count_of(AuthEventType::Logout), 1);
}

#[actix_web::test]
async fn test_logout_when_disabled_stays_local() {
    let (app, _harness) = create_test_app(CasSettings::new()).await;

    let resp = test::call_service(&app, TestRequest::get().uri("/logout").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let target = location(&resp);
    assert_eq!(target, "/");
    assert!(!target.contains("cas.example.com"));
}

#[actix_web::test]
async fn test_logout_without_session_still_redirects() {
    let (app, harness) = create_test_app(enabled_settings()).await;

    let resp = test::call_service(&app, TestRequest::get().uri("/logout").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("https://cas.example.com/logout?service="));
    // nobody was signed in, nothing to audit
    assert_eq!(harness.events.count_of(AuthEventType::Logout), 0);
}
