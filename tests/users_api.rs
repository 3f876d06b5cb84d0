//! Staff account guards on `/api/users`.

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use hrpay::auth::role_cache::Principal;
use hrpay::model::role::Role;
use hrpay::utils::{email_cache, email_filter};
use serde_json::{Value, json};

#[macro_use]
mod support;
use support::{TestState, anonymous, authed};

async fn admin_state() -> (TestState, String) {
    let state = TestState::new();
    let admin = Principal::user(1);
    state.seed(admin, Role::Admin, true, true).await;
    let token = state.token(admin, "admin@company.ph", Role::Admin);
    (state, token)
}

#[actix_web::test]
async fn missing_token_is_unauthorized() {
    let state = TestState::new();
    let app = init_app!(state);

    let req = anonymous(TestRequest::get().uri("/api/users")).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn refresh_token_is_not_accepted_as_access_token() {
    let state = TestState::new();
    let admin = Principal::user(1);
    state.seed(admin, Role::Admin, true, true).await;
    let subject = hrpay::auth::jwt::TokenSubject {
        principal: admin,
        sub: "admin@company.ph",
        role: Role::Admin,
    };
    let (refresh, _) =
        hrpay::auth::jwt::generate_refresh_token(&subject, support::SECRET, 3600).unwrap();
    let app = init_app!(state);

    let req = authed(TestRequest::get().uri("/api/users"), &refresh).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn deactivated_account_is_rejected_even_with_valid_token() {
    let state = TestState::new();
    let user = Principal::user(2);
    state.seed(user, Role::Hr, false, false).await;
    let token = state.token(user, "former@company.ph", Role::Hr);
    let app = init_app!(state);

    let req = authed(TestRequest::get().uri("/api/users"), &token).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Account is deactivated");
}

#[actix_web::test]
async fn role_comes_from_profile_not_token() {
    // token still says admin, profile was demoted to hr
    let state = TestState::new();
    let user = Principal::user(3);
    state.seed(user, Role::Hr, true, false).await;
    let token = state.token(user, "demoted@company.ph", Role::Admin);
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/users/create"), &token)
        .set_json(json!({
            "email": "new.hire@company.ph",
            "password": "Welcome2026",
            "full_name": "New Hire",
            "role": "hr"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_cannot_delete_self() {
    let (state, token) = admin_state().await;
    let app = init_app!(state);

    let req = authed(TestRequest::delete().uri("/api/users/delete"), &token)
        .set_json(json!({ "user_id": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admin_cannot_deactivate_self() {
    let (state, token) = admin_state().await;
    let app = init_app!(state);

    let req = authed(TestRequest::patch().uri("/api/users/update-status"), &token)
        .set_json(json!({ "user_id": 1, "is_active": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Cannot deactivate your own account");
}

#[actix_web::test]
async fn weak_password_is_rejected_before_any_lookup() {
    let (state, token) = admin_state().await;
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/users/create"), &token)
        .set_json(json!({
            "email": "weak@company.ph",
            "password": "short",
            "full_name": "Weak Password",
            "role": "hr"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn employee_role_cannot_be_assigned_to_staff() {
    let (state, token) = admin_state().await;
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/users/create"), &token)
        .set_json(json!({
            "email": "someone@company.ph",
            "password": "Welcome2026",
            "full_name": "Someone",
            "role": "employee"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn known_email_conflicts_without_database() {
    let email = "Taken.Person@Company.ph";
    email_filter::insert(email);
    email_cache::mark_taken(email).await;

    let (state, token) = admin_state().await;
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/users/create"), &token)
        .set_json(json!({
            "email": "  taken.person@company.ph ",
            "password": "Welcome2026",
            "full_name": "Taken Person",
            "role": "account_manager"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Email already exists");
}

#[actix_web::test]
async fn admin_cannot_demote_self() {
    let (state, token) = admin_state().await;
    let app = init_app!(state);

    let req = authed(TestRequest::patch().uri("/api/users/1"), &token)
        .set_json(json!({ "role": "hr" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
