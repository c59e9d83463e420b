use clap::{Arg, ArgAction, Command};

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_EXPIRY: &str = "jwt-expiry";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_OTP_TTL_MINUTES: &str = "otp-ttl-minutes";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign and verify session tokens")
                .env("CARTMATE_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_EXPIRY)
                .long(ARG_JWT_EXPIRY)
                .help("Session token lifetime, e.g. 24h, 7d, 30m, 900s")
                .env("CARTMATE_JWT_EXPIRY")
                .default_value("24h"),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL, allowed as the CORS origin")
                .env("CARTMATE_FRONTEND_BASE_URL")
                .default_value("https://cartmate.app"),
        )
        .arg(
            Arg::new(ARG_OTP_TTL_MINUTES)
                .long(ARG_OTP_TTL_MINUTES)
                .help("Email verification code TTL in minutes")
                .env("CARTMATE_OTP_TTL_MINUTES")
                .default_value("10")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie as Secure (HTTPS deployments)")
                .env("CARTMATE_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}
