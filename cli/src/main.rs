
use authsync::handoff::{self, HandoffRejection};
use authsync::persistence::cookie;
use authsync::{AuthConfig, AuthError, Clock, SameSite, SystemClock};
use clap::{Args, Parser, Subcommand};
use envelopes::Subject;
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid subject JSON: {0}")]
    Subject(#[from] envelopes::CodecError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("hand-off rejected: {0}")]
    Rejected(#[from] HandoffRejection),
    #[error("no hand-off parameters in {0}")]
    NoHandoff(String),
    #[error("invalid same-site policy `{0}`; expected strict, lax or none")]
    InvalidSameSite(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "authsync-cli", about = "Inspect and produce auth hand-off URLs and session cookies")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a hand-off URL carrying the given session.
    Encode(EncodeArgs),
    /// Decode the hand-off parameters of a URL and check the replay window.
    Inspect(InspectArgs),
    /// Print the cookie assignments written for a session.
    Cookie(CookieArgs),
}

#[derive(Args, Debug)]
struct EncodeArgs {
    #[arg(long)]
    url: String,

    #[arg(long, env = "AUTHSYNC_TOKEN")]
    token: String,

    #[arg(long, help = "Subject as JSON")]
    user: String,

    #[arg(long, help = "Epoch milliseconds; defaults to now")]
    timestamp: Option<i64>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    url: String,

    #[arg(long, help = "Epoch milliseconds to check against; defaults to now")]
    now: Option<i64>,
}

#[derive(Args, Debug)]
struct CookieArgs {
    #[arg(long, env = "AUTHSYNC_TOKEN")]
    token: String,

    #[arg(long, help = "Subject as JSON")]
    user: String,

    #[arg(long)]
    domain: Option<String>,

    #[arg(long, default_value_t = false)]
    secure: bool,

    #[arg(long, default_value = "lax")]
    same_site: String,

    #[arg(long)]
    lifetime_ms: Option<i64>,

    #[arg(long, default_value_t = false, help = "Print the deleting assignments instead")]
    clear: bool,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Encode(args) => {
            println!("{}", run_encode(&args)?);
            Ok(())
        }
        Command::Inspect(args) => {
            print_json(&run_inspect(&args)?)?;
            Ok(())
        }
        Command::Cookie(args) => {
            for assignment in run_cookie(&args)? {
                println!("{assignment}");
            }
            Ok(())
        }
    }
}

fn run_encode(args: &EncodeArgs) -> Result<String, CliError> {
    let subject: Subject = envelopes::decode_subject(&args.user)?;
    let timestamp = args.timestamp.unwrap_or_else(|| SystemClock.now_ms());
    Ok(handoff::encode_url(&args.url, &args.token, &subject, timestamp)?)
}

fn run_inspect(args: &InspectArgs) -> Result<Value, CliError> {
    let found = handoff::extract(&args.url)?.ok_or_else(|| CliError::NoHandoff(args.url.clone()))?;
    let now = args.now.unwrap_or_else(|| SystemClock.now_ms());
    handoff::check_fresh(found.payload.timestamp, now)?;

    Ok(json!({
        "token": found.payload.token,
        "user": serde_json::to_value(&found.payload.user)?,
        "timestamp": found.payload.timestamp,
        "ageMs": now.saturating_sub(found.payload.timestamp),
        "strippedUrl": found.stripped_url,
    }))
}

fn run_cookie(args: &CookieArgs) -> Result<[String; 2], CliError> {
    let same_site = SameSite::parse(&args.same_site).ok_or_else(|| CliError::InvalidSameSite(args.same_site.clone()))?;
    let mut config = AuthConfig::default().with_secure(args.secure).with_same_site(same_site);
    if let Some(domain) = &args.domain {
        config = config.with_domain(domain.clone());
    }
    if let Some(ms) = args.lifetime_ms {
        config = config.with_token_lifetime_ms(ms);
    }

    if args.clear {
        return Ok(cookie::clearing_cookies(&config));
    }
    let subject = envelopes::decode_subject(&args.user)?;
    let user_json = envelopes::encode_subject(&subject)?;
    Ok(cookie::session_cookies(&args.token, &user_json, &config))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
