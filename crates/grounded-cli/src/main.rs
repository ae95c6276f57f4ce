use clap::{value_parser, Arg, ArgAction, Command};
use grounded_client::{ClientConfig, HttpMessageClient};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;

fn message_id_arg() -> Arg {
    Arg::new("id")
        .required(true)
        .value_parser(value_parser!(i64))
        .help("Message id")
}

fn references_arg() -> Arg {
    Arg::new("ref")
        .long("ref")
        .action(ArgAction::Append)
        .value_parser(value_parser!(i64))
        .help("Reference id to ground against (repeatable)")
}

fn top_k_arg() -> Arg {
    Arg::new("top-k")
        .long("top-k")
        .value_parser(value_parser!(u32).range(1..))
        .help("Evidence chunks to retrieve")
}

fn cli() -> Command {
    Command::new("grounded")
        .version(grounded_client::VERSION)
        .about("Generate, refine, and review citation-grounded messages")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .global(true)
                .help("API root (defaults to $GROUNDED_API_URL or http://localhost:8000)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("generate")
                .about("Stream a new grounded message")
                .arg(
                    Arg::new("prompt")
                        .long("prompt")
                        .required(true)
                        .help("What the message should say"),
                )
                .arg(references_arg().required(true))
                .arg(top_k_arg()),
        )
        .subcommand(
            Command::new("refine")
                .about("Append a refined version to a draft")
                .arg(message_id_arg())
                .arg(
                    Arg::new("instruction")
                        .long("instruction")
                        .required(true)
                        .help("How to change the message"),
                )
                .arg(references_arg())
                .arg(top_k_arg()),
        )
        .subcommand(
            Command::new("edit")
                .about("Replace the text of a draft by hand")
                .arg(message_id_arg())
                .arg(
                    Arg::new("text")
                        .long("text")
                        .required(true)
                        .help("New message text"),
                ),
        )
        .subcommand(
            Command::new("finalize")
                .about("Lock a message against content changes")
                .arg(message_id_arg()),
        )
        .subcommand(
            Command::new("revert")
                .about("Return a finalized message to draft")
                .arg(message_id_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("Print a message with every version")
                .arg(message_id_arg()),
        )
        .subcommand(Command::new("list").about("List messages with their latest version"))
        .subcommand(Command::new("references").about("List references available for grounding"))
}

fn setup_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries command output; logs go to stderr
    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn client(api_url: Option<&String>) -> anyhow::Result<HttpMessageClient> {
    let config = match api_url {
        Some(url) => ClientConfig::new().with_base_url(url.as_str()),
        None => ClientConfig::from_env()?,
    };
    Ok(HttpMessageClient::new(config)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    setup_logging(matches.get_flag("json-logs"));

    let outcome = match client(matches.get_one::<String>("api-url")) {
        Ok(client) => commands::run(&client, &matches).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
