use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub qr_secret: String,
    pub server_addr: String,

    /// Organization time zone as minutes east of UTC (e.g. 420 for UTC+7).
    pub org_utc_offset_minutes: i32,
    pub late_cutoff_hour: u32,
    pub late_cutoff_minute: u32,

    /// Employees folded into one all-employees report request.
    pub report_batch_limit: u32,

    // Rate limiting
    pub rate_attendance_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
}

fn numeric_env<T: FromStr>(name: &str, default: &str) -> T {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid number"))
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            qr_secret: env::var("QR_SECRET").expect("QR_SECRET must be set"),

            // default UTC+7
            org_utc_offset_minutes: numeric_env("ORG_UTC_OFFSET_MINUTES", "420"),
            late_cutoff_hour: numeric_env("LATE_CUTOFF_HOUR", "8"),
            late_cutoff_minute: numeric_env("LATE_CUTOFF_MINUTE", "15"),

            report_batch_limit: numeric_env("REPORT_BATCH_LIMIT", "200"),

            rate_attendance_per_min: numeric_env("RATE_ATTENDANCE_PER_MIN", "120"),
            rate_protected_per_min: numeric_env("RATE_PROTECTED_PER_MIN", "1000"),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }
}
