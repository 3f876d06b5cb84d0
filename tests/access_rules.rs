//! Role and ownership checks that run before any database access.

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use hrpay::auth::role_cache::Principal;
use hrpay::model::role::Role;
use serde_json::json;

#[macro_use]
mod support;
use support::{TestState, authed};

async fn employee(id: u64) -> (TestState, String) {
    let state = TestState::new();
    let principal = Principal::employee(id);
    state.seed(principal, Role::Employee, true, false).await;
    let token = state.token(principal, "EMP-0042", Role::Employee);
    (state, token)
}

async fn hr_without_salary() -> (TestState, String) {
    let state = TestState::new();
    let principal = Principal::user(20);
    state.seed(principal, Role::Hr, true, false).await;
    let token = state.token(principal, "hr@company.ph", Role::Hr);
    (state, token)
}

#[actix_web::test]
async fn staff_cannot_clock_in() {
    let (state, token) = hr_without_salary().await;
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/time-clock/clock-in"), &token)
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn clock_in_needs_both_coordinates() {
    let (state, token) = employee(42).await;
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/time-clock/clock-in"), &token)
        .set_json(json!({ "latitude": 14.5547 }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn employee_cannot_read_another_timesheet() {
    let (state, token) = employee(42).await;
    let app = init_app!(state);

    let req = authed(TestRequest::get().uri("/api/timesheets/43"), &token).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn employee_cannot_list_employees() {
    let (state, token) = employee(42).await;
    let app = init_app!(state);

    let req = authed(TestRequest::get().uri("/api/employee"), &token).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn fund_request_amount_must_be_positive() {
    let (state, token) = employee(42).await;
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/fund-requests"), &token)
        .set_json(json!({ "amount": 0.0, "purpose": "Transportation" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn only_employees_file_fund_requests() {
    let (state, token) = hr_without_salary().await;
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/fund-requests"), &token)
        .set_json(json!({ "amount": 500.0, "purpose": "Supplies" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn leave_dates_must_be_ordered() {
    let (state, token) = employee(42).await;
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/leave"), &token)
        .set_json(json!({
            "start_date": "2026-06-10",
            "end_date": "2026-06-08",
            "leave_type": "sick"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn payslips_need_salary_access() {
    let (state, token) = hr_without_salary().await;
    let app = init_app!(state);

    let req = authed(TestRequest::post().uri("/api/payslips"), &token)
        .set_json(json!({ "employee_id": 42 }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn rest_day_range_is_validated() {
    let (state, token) = hr_without_salary().await;
    let app = init_app!(state);

    let req = authed(TestRequest::put().uri("/api/rest-days/42"), &token)
        .set_json(json!({
            "from": "2026-06-30",
            "to": "2026-06-01",
            "dates": []
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
