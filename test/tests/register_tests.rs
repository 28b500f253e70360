//! Auto-provisioning flow: prefilled form, forced fields, recoverable
//! validation failures and session re-entry without the spent ticket.

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};

use actix_cas_core::http::cas::{AuthEventType, CasSettings, UserStore};
use common::*;

#[actix_web::test]
async fn test_unknown_principal_is_sent_to_registration() {
    let (app, harness) = create_test_app(autocreate_settings()).await;
    harness.issue_ticket("ST-1", "carol").await;

    let resp =
        test::call_service(&app, TestRequest::get().uri("/cas?ticket=ST-1").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/cas/register");
    // no account was created yet
    assert!(harness.store.find_by_login("carol").await.unwrap().is_none());
}

#[actix_web::test]
async fn test_registration_form_is_prefilled_from_attributes() {
    let (app, harness) = create_test_app(autocreate_settings()).await;
    harness
        .issue_ticket_with_attributes(
            "ST-1",
            "carol",
            &[
                ("firstname", "Carol"),
                ("lastname", "Jones"),
                ("mail", "carol@example.com"),
                ("department", "R&D"),
            ],
        )
        .await;

    let resp =
        test::call_service(&app, TestRequest::get().uri("/cas?ticket=ST-1").to_request()).await;
    let cookie = session_cookie(&resp);

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/cas/register")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("carol"));
    assert!(body.contains("value=\"Carol\""));
    assert!(body.contains("value=\"Jones\""));
    assert!(body.contains("value=\"carol@example.com\""));
    // not in the import list
    assert!(!body.contains("R&amp;D"));
}

#[actix_web::test]
async fn test_submit_creates_active_account_and_signs_in() {
    let (app, harness) = create_test_app(autocreate_settings()).await;
    harness.issue_ticket("ST-1", "carol").await;

    let resp =
        test::call_service(&app, TestRequest::get().uri("/cas?ticket=ST-1").to_request()).await;
    let cookie = session_cookie(&resp);

    // hostile submission: claims a different login and admin rights
    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/cas/register")
            .cookie(cookie)
            .set_form([
                ("firstname", "Carol"),
                ("lastname", "Jones"),
                ("mail", "carol@example.com"),
                ("login", "impostor"),
                ("admin", "true"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/my/account");
    let cookie = session_cookie(&resp);

    let resp = test::call_service(
        &app,
        TestRequest::get().uri("/my/account").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "Account of carol");

    let carol = harness.store.find_by_login("carol").await.unwrap().unwrap();
    assert!(carol.is_active());
    assert!(!carol.is_admin());
    assert!(harness
        .store
        .find_by_login("impostor")
        .await
        .unwrap()
        .is_none());

    assert_eq!(harness.events.count_of(AuthEventType::UserProvisioned), 1);
    assert_eq!(harness.events.count_of(AuthEventType::LoginSuccess), 1);
}

#[actix_web::test]
async fn test_invalid_submit_rerenders_then_accepts_correction() {
    let (app, harness) = create_test_app(autocreate_settings()).await;
    harness.issue_ticket("ST-1", "carol").await;

    let resp =
        test::call_service(&app, TestRequest::get().uri("/cas?ticket=ST-1").to_request()).await;
    let cookie = session_cookie(&resp);

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/cas/register")
            .cookie(cookie.clone())
            .set_form([("firstname", ""), ("lastname", "Jones"), ("mail", "nope")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("first name is required"));
    assert!(body.contains("email is invalid"));
    assert!(harness.store.find_by_login("carol").await.unwrap().is_none());
    assert_eq!(harness.events.count_of(AuthEventType::ProvisioningFailed), 1);

    // correction goes through on the same session, ticket long spent
    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/cas/register")
            .cookie(cookie)
            .set_form([
                ("firstname", "Carol"),
                ("lastname", "Jones"),
                ("mail", "carol@example.com"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/my/account");
    assert!(harness.store.find_by_login("carol").await.unwrap().is_some());
}

#[actix_web::test]
async fn test_registration_uses_default_language_when_blank() {
    let (app, harness) = create_test_app(autocreate_settings()).await;
    harness.issue_ticket("ST-1", "carol").await;

    let resp =
        test::call_service(&app, TestRequest::get().uri("/cas?ticket=ST-1").to_request()).await;
    let cookie = session_cookie(&resp);

    test::call_service(
        &app,
        TestRequest::post()
            .uri("/cas/register")
            .cookie(cookie)
            .set_form([
                ("firstname", "Carol"),
                ("lastname", "Jones"),
                ("mail", "carol@example.com"),
                ("language", ""),
            ])
            .to_request(),
    )
    .await;

    let carol = harness.store.find_by_login("carol").await.unwrap().unwrap();
    assert_eq!(carol.get_language(), "en");
}

#[actix_web::test]
async fn test_register_without_principal_bounces_to_cas() {
    let (app, _harness) = create_test_app(autocreate_settings()).await;

    let resp =
        test::call_service(&app, TestRequest::get().uri("/cas/register").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("https://cas.example.com/login?service="));
}

#[actix_web::test]
async fn test_disabled_gate_redirects_registration() {
    let (app, _harness) = create_test_app(CasSettings::new()).await;

    let resp =
        test::call_service(&app, TestRequest::get().uri("/cas/register").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}
