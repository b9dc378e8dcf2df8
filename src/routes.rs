use crate::{
    api::{attendance, leave, report},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;

// Per-route limiter. The rate is clamped to at least one request per minute;
// a zero replenish interval or a zero burst would make the builder bail.
fn build_limiter(requests_per_min: u32) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_min = requests_per_min.max(1);
    let per_ms = (60_000 / per_min as u64).max(1);
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap()
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let attendance_limiter = build_limiter(config.rate_attendance_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/attendance")
                    .wrap(Governor::new(&attendance_limiter))
                    // /attendance/check-in, /attendance/check-out
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    // QR token issuance
                    .service(
                        web::resource("/qr/batch")
                            .route(web::post().to(attendance::issue_batch_qr)),
                    )
                    .service(
                        web::resource("/qr/record/{record_id}")
                            .route(web::post().to(attendance::issue_record_qr)),
                    ),
            )
            .service(
                web::scope("/leave")
                    .wrap(Governor::new(&protected_limiter))
                    // /leave
                    .service(web::resource("").route(web::post().to(leave::create_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(leave::reject_leave)),
                    ),
            )
            .service(
                web::scope("/report")
                    .wrap(Governor::new(&protected_limiter))
                    // /report/{year}/{month} — all active employees
                    .service(
                        web::resource("/{year}/{month}")
                            .route(web::get().to(report::all_employees_report)),
                    )
                    // /report/{employee_id}/{year}/{month}
                    .service(
                        web::resource("/{employee_id}/{year}/{month}")
                            .route(web::get().to(report::monthly_report)),
                    ),
            ),
    );
}
