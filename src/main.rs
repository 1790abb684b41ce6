use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use postflow::core::{BrowserConfig, Config, Platform, PlatformProfile};
use postflow::{Credentials, ErrorKind, PublishError, SessionController, Thread};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_FAILED: u8 = 1;
const EXIT_INVALID_INPUT: u8 = 2;

fn cli() -> Command {
    Command::new("postflow")
        .about("Publish a post or thread through a headless browser session")
        .arg(
            Arg::new("platform")
                .help("Target platform: twitter (x) or linkedin")
                .required(true),
        )
        .arg(
            Arg::new("content")
                .help("Text to publish, or a JSON array of items with --thread")
                .required(true),
        )
        .arg(
            Arg::new("thread")
                .long("thread")
                .help("Treat content as a JSON array of items")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("reply-chain")
                .long("reply-chain")
                .help("Publish every item after the first as a reply to the previous one")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON file overriding browser and timing settings"),
        )
        .arg(
            Arg::new("profile")
                .long("profile")
                .value_name("FILE")
                .help("JSON platform profile replacing the built-in one"),
        )
        .arg(
            Arg::new("headed")
                .long("headed")
                .help("Show the browser window")
                .action(ArgAction::SetTrue),
        )
}

struct Invocation {
    thread: Thread,
    credentials: Credentials,
    profile: PlatformProfile,
    config: Config,
}

fn prepare(matches: &ArgMatches) -> anyhow::Result<Invocation> {
    let platform: Platform = matches
        .get_one::<String>("platform")
        .context("platform is required")?
        .parse()?;
    let content = matches
        .get_one::<String>("content")
        .context("content is required")?;

    let thread = if matches.get_flag("thread") {
        Thread::from_json(content)?
    } else {
        Thread::single(content.as_str())
    }
    .with_reply_chain(matches.get_flag("reply-chain"));
    thread.validate()?;

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_json_file(path).map_err(as_invalid_input)?,
        None => Config::default(),
    };
    if matches.get_flag("headed") {
        config.browser = BrowserConfig {
            headless: false,
            ..config.browser
        };
    }

    let profile = match matches.get_one::<String>("profile") {
        Some(path) => PlatformProfile::from_json_file(path).map_err(as_invalid_input)?,
        None => platform.profile(),
    };
    profile.validate()?;

    let credentials = Credentials::from_env(platform.env_prefix())?;

    Ok(Invocation {
        thread,
        credentials,
        profile,
        config,
    })
}

/// Unreadable config or profile files are the caller's mistake, not a driver failure.
fn as_invalid_input(err: PublishError) -> PublishError {
    match err {
        PublishError::Io(e) => PublishError::InvalidInput(e.to_string()),
        other => other,
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PublishError>().map(PublishError::kind) {
        Some(ErrorKind::InvalidInput) => EXIT_INVALID_INPUT,
        _ => EXIT_FAILED,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    let invocation = match prepare(&matches) {
        Ok(invocation) => invocation,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(exit_code_for(&e));
        }
    };

    info!(
        "publishing {} item(s) to {}",
        invocation.thread.len(),
        invocation.profile.name
    );

    let mut controller = SessionController::chrome(invocation.config);
    let result = match controller
        .publish(invocation.thread, &invocation.credentials, &invocation.profile)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_FAILED);
        }
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("could not serialize result: {}", e);
            return ExitCode::from(EXIT_FAILED);
        }
    }

    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    }
}
