use clap::{Arg, ArgAction, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_otp_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL, used as the allowed CORS origin")
                .env("VETRINA_FRONTEND_BASE_URL")
                .default_value("https://shop.vetrina.dev"),
        )
        .arg(
            Arg::new("session-secret")
                .long("session-secret")
                .help("HMAC secret for signing session tokens")
                .env("VETRINA_SESSION_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session token TTL in seconds")
                .env("VETRINA_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("google-client-id")
                .long("google-client-id")
                .help("Google OAuth client id; enables Google sign-in when set")
                .env("VETRINA_GOOGLE_CLIENT_ID"),
        )
}

fn with_otp_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("otp-ttl-seconds")
                .long("otp-ttl-seconds")
                .help("Verification code TTL in seconds")
                .env("VETRINA_OTP_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("otp-max-attempts")
                .long("otp-max-attempts")
                .help("Wrong-code attempts before a request is invalidated")
                .env("VETRINA_OTP_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new("debug-return-code")
                .long("debug-return-code")
                .help("Echo issued codes in responses (development only)")
                .env("VETRINA_DEBUG_RETURN_CODE")
                .action(ArgAction::SetTrue),
        )
}
