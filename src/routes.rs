use crate::{
    api::{
        employee, fund_requests, holidays, leave_request, loans, office_locations, overtime,
        overtime_groups, payslips, rest_days, time_clock, timesheet, users,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;
use tracing::warn;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            warn!(requests_per_min, "Invalid rate limit, using governor defaults");
            Default::default()
        });
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/employee-login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::employee_login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/users")
                    .service(web::resource("").route(web::get().to(users::list_users)))
                    .service(web::resource("/create").route(web::post().to(users::create_user)))
                    .service(web::resource("/delete").route(web::delete().to(users::delete_user)))
                    .service(
                        web::resource("/update-status")
                            .route(web::patch().to(users::update_status)),
                    )
                    .service(
                        web::resource("/{user_id}").route(web::patch().to(users::update_user)),
                    ),
            )
            .service(
                web::scope("/employee")
                    // /employee
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // must precede /{id}
                    .service(web::resource("/me").route(web::get().to(employee::my_profile)))
                    .service(
                        web::resource("/change-password")
                            .route(web::post().to(employee::change_password)),
                    )
                    // /employee/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/time-clock")
                    .service(
                        web::resource("/clock-in").route(web::post().to(time_clock::clock_in)),
                    )
                    .service(
                        web::resource("/clock-out").route(web::post().to(time_clock::clock_out)),
                    )
                    .service(
                        web::resource("/entries")
                            .route(web::get().to(time_clock::list_entries))
                            .route(web::post().to(time_clock::create_manual_entry)),
                    )
                    .service(
                        web::resource("/entries/{id}")
                            .route(web::put().to(time_clock::correct_entry)),
                    ),
            )
            .service(
                web::scope("/timesheets")
                    .service(web::resource("/{id}").route(web::get().to(timesheet::get_timesheet)))
                    .service(
                        web::resource("/{id}/generate")
                            .route(web::post().to(timesheet::generate_timesheet)),
                    )
                    .service(
                        web::resource("/{id}/drift")
                            .route(web::get().to(timesheet::timesheet_drift)),
                    ),
            )
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::get().to(holidays::list_holidays))
                            .route(web::post().to(holidays::create_holiday)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(holidays::delete_holiday)),
                    ),
            )
            .service(
                web::resource("/rest-days/{id}")
                    .route(web::get().to(rest_days::list_rest_days))
                    .route(web::put().to(rest_days::set_rest_days)),
            )
            .service(
                web::scope("/office-locations")
                    .service(
                        web::resource("")
                            .route(web::get().to(office_locations::list_office_locations))
                            .route(web::post().to(office_locations::create_office_location)),
                    )
                    .service(
                        web::resource("/{id}/deactivate")
                            .route(web::patch().to(office_locations::deactivate_office_location)),
                    ),
            )
            .service(
                web::resource("/overtime-groups")
                    .route(web::get().to(overtime_groups::list_overtime_groups))
                    .route(web::post().to(overtime_groups::create_overtime_group)),
            )
            .service(
                web::scope("/overtime")
                    .service(
                        web::resource("")
                            .route(web::get().to(overtime::list_overtime))
                            .route(web::post().to(overtime::create_overtime)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(overtime::get_overtime)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(overtime::approve_overtime)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(overtime::reject_overtime)),
                    ),
            )
            .service(
                web::scope("/fund-requests")
                    .service(
                        web::resource("")
                            .route(web::get().to(fund_requests::list_fund_requests))
                            .route(web::post().to(fund_requests::create_fund_request)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(fund_requests::get_fund_request)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(fund_requests::approve_fund_request)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(fund_requests::reject_fund_request)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // credits before /{id}/...
                    .service(
                        web::resource("/credits/refresh")
                            .route(web::post().to(leave_request::refresh_employee_leave_balances)),
                    )
                    .service(
                        web::resource("/credits/{employee_id}")
                            .route(web::get().to(leave_request::get_employee_leave_credits)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::scope("/loans")
                    .service(
                        web::resource("")
                            .route(web::get().to(loans::list_loans))
                            .route(web::post().to(loans::create_loan)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(loans::get_loan))),
            )
            .service(
                web::scope("/payslips")
                    .service(
                        web::resource("")
                            .route(web::get().to(payslips::list_payslips))
                            .route(web::post().to(payslips::generate_payslip)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(payslips::get_payslip))),
            ),
    );
}

// LOGIN (staff email or employee code)
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days, single use)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new token pair, old refresh token revoked
