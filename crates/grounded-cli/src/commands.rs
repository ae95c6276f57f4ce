use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use grounded_client::HttpMessageClient;
use grounded_message::{
    EditRequest, GenerateRequest, MessageId, MessageService, MessageStatus, RefineRequest,
    ReferenceId,
};
use grounded_stream::ProgressState;
use serde::Serialize;
use std::io::Write;

pub(crate) async fn run(client: &HttpMessageClient, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("generate", args)) => generate(client, args).await,
        Some(("refine", args)) => {
            let mut request = RefineRequest::new(string(args, "instruction")?)
                .with_references(references(args));
            if let Some(top_k) = args.get_one::<u32>("top-k") {
                request = request.with_top_k(*top_k);
            }
            print_json(&client.refine(message_id(args)?, request).await?)
        }
        Some(("edit", args)) => {
            let request = EditRequest::new(string(args, "text")?);
            print_json(&client.edit(message_id(args)?, request).await?)
        }
        Some(("finalize", args)) => {
            print_json(&client.set_status(message_id(args)?, MessageStatus::Finalized).await?)
        }
        Some(("revert", args)) => {
            print_json(&client.set_status(message_id(args)?, MessageStatus::Draft).await?)
        }
        Some(("show", args)) => print_json(&client.get_message(message_id(args)?).await?),
        Some(("list", _)) => print_json(&client.list_messages().await?),
        Some(("references", _)) => print_json(&client.list_references().await?),
        Some((other, _)) => bail!("unknown command {other}"),
        None => bail!("no command given"),
    }
}

async fn generate(client: &HttpMessageClient, args: &ArgMatches) -> Result<()> {
    let mut request = GenerateRequest::new(string(args, "prompt")?, references(args));
    if let Some(top_k) = args.get_one::<u32>("top-k") {
        request = request.with_top_k(*top_k);
    }

    let mut progress = ProgressPrinter::default();
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let result = client
        .generate_until(request, &mut |state: &ProgressState| progress.show(state), cancel)
        .await?;
    progress.finish();

    for warning in &result.warnings {
        tracing::warn!("{warning}");
    }
    print_json(&result)
}

/// Writes stage changes and the live preview to stderr
#[derive(Debug, Default)]
struct ProgressPrinter {
    stage: String,
    printed: String,
}

impl ProgressPrinter {
    fn show(&mut self, state: &ProgressState) {
        let mut err = std::io::stderr().lock();
        if state.stage() != self.stage {
            if !self.printed.is_empty() {
                let _ = writeln!(err);
                self.printed.clear();
            }
            let _ = writeln!(err, "[{}]", state.stage());
            self.stage = state.stage().to_string();
        }

        let preview = state.preview();
        if preview.is_empty() || preview == self.printed {
            return;
        }
        match preview.strip_prefix(self.printed.as_str()) {
            Some(suffix) => {
                let _ = write!(err, "{suffix}");
            }
            // Preview was recomputed rather than extended
            None => {
                let _ = write!(err, "\n{preview}");
            }
        }
        let _ = err.flush();
        self.printed = preview.to_string();
    }

    fn finish(&self) {
        if !self.printed.is_empty() {
            eprintln!();
        }
    }
}

fn string(args: &ArgMatches, name: &str) -> Result<String> {
    args.get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

fn message_id(args: &ArgMatches) -> Result<MessageId> {
    args.get_one::<i64>("id")
        .copied()
        .map(MessageId)
        .context("missing message id")
}

fn references(args: &ArgMatches) -> Vec<ReferenceId> {
    args.get_many::<i64>("ref")
        .map(|ids| ids.copied().map(ReferenceId).collect())
        .unwrap_or_default()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{text}");
    Ok(())
}
