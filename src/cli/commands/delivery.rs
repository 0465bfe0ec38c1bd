use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_sms_args(command);
    with_email_args(command)
}

fn with_sms_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("twilio-account-sid")
                .long("twilio-account-sid")
                .help("Twilio account SID; SMS codes are logged when unset")
                .env("VETRINA_TWILIO_ACCOUNT_SID"),
        )
        .arg(
            Arg::new("twilio-auth-token")
                .long("twilio-auth-token")
                .help("Twilio auth token")
                .env("VETRINA_TWILIO_AUTH_TOKEN")
                .requires("twilio-account-sid"),
        )
        .arg(
            Arg::new("twilio-from")
                .long("twilio-from")
                .help("Sender phone number for outbound SMS")
                .env("VETRINA_TWILIO_FROM")
                .requires("twilio-account-sid"),
        )
}

fn with_email_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("email-relay-url")
                .long("email-relay-url")
                .help("Email relay endpoint; email codes are logged when unset")
                .env("VETRINA_EMAIL_RELAY_URL"),
        )
        .arg(
            Arg::new("email-relay-token")
                .long("email-relay-token")
                .help("Bearer token for the email relay")
                .env("VETRINA_EMAIL_RELAY_TOKEN")
                .requires("email-relay-url"),
        )
}
