use crate::app::render::{render_plan, render_rejection, render_summary, render_tiers};
use crate::cli::{Cli, Commands, RunArgs};
use crate::config::Config;
use crate::crew::{build_crew_graph, prepare_input};
use crate::error::CrewError;
use crate::llm::{EchoClient, ModelClient, OpenAiCompatibleClient, ResilientInvoker};
use crate::observability::{MultiObserver, Observer, RecordingObserver, create_observer};
use crate::planner::GraphExecutor;
use crate::report::write_outputs;
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::io::Read as _;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Load config, apply overrides and run the selected command. Returns the
/// process exit code.
pub async fn dispatch(cli: Cli) -> Result<i32> {
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_init()?,
    };
    config.apply_env_overrides();
    if let Some(provider) = cli.provider.as_deref() {
        config.provider = provider.trim().to_ascii_lowercase();
    }
    config.validate()?;

    match cli.command {
        Commands::Run(args) => run_crew(&config, args).await,
        Commands::Plan => {
            let registry = config.tier_registry()?;
            let provider = config.active_provider(&registry)?;
            let graph = build_crew_graph(&config.agents)?;
            registry.validate_tiers(&provider, graph.tiers())?;
            println!("{}", render_plan(&graph, &registry, &provider)?);
            Ok(0)
        }
        Commands::Tiers => {
            let registry = config.tier_registry()?;
            let provider = config.active_provider(&registry)?;
            println!("{}", render_tiers(&registry, &provider));
            Ok(0)
        }
    }
}

async fn run_crew(config: &Config, args: RunArgs) -> Result<i32> {
    let payload = read_payload(args.payload.as_deref(), args.prompt.as_deref()).await?;
    let today = chrono::Local::now().date_naive();

    let prepared = match prepare_input(&payload, today) {
        Ok(prepared) => prepared,
        Err(CrewError::Input(rejection)) => {
            warn!("Input rejected: {rejection}");
            if args.json {
                let mut body = serde_json::to_value(&rejection)?;
                if let Value::Object(fields) = &mut body {
                    fields.insert("status".into(), json!("error"));
                    fields.insert("message".into(), json!(rejection.to_string()));
                    fields.insert("guidance".into(), json!(crate::crew::guidance(&rejection)));
                }
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                eprintln!("{}", render_rejection(&rejection));
            }
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        format = ?prepared.format,
        defaulted = prepared.defaulted.len(),
        "Prepared crew input"
    );

    let registry = Arc::new(config.tier_registry()?);
    let provider = Arc::new(config.active_provider(&registry)?);
    let graph = build_crew_graph(&config.agents)?;

    let client: Arc<dyn ModelClient> = if args.dry_run {
        Arc::new(EchoClient)
    } else {
        Arc::new(OpenAiCompatibleClient::new(
            &config.remote.base_url,
            config.remote.api_key.as_deref(),
            config.remote.timeout_secs,
        ))
    };

    let recorder = Arc::new(RecordingObserver::new());
    let recording: Arc<dyn Observer> = recorder.clone();
    let observer: Arc<dyn Observer> = Arc::new(MultiObserver::new(vec![
        create_observer(&config.observability),
        recording,
    ]));

    let invoker = ResilientInvoker::new(client, Arc::clone(&registry))
        .with_policy(config.backoff_policy())
        .with_classifier(Arc::new(config.classifier()))
        .with_observer(Arc::clone(&observer))
        .with_params(config.generation_params());
    let executor =
        GraphExecutor::new(registry, provider, Arc::new(invoker)).with_observer(observer);

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run");
                cancel.cancel();
            }
        }
    });
    let result = executor
        .run_with_cancel(&graph, &prepared.input, cancel)
        .await;
    interrupt.abort();
    let result = result?;

    if let Some(dir) = args.output.as_deref() {
        let written = write_outputs(&result, dir).await?;
        info!(
            document = %written.document.display(),
            result = %written.result.display(),
            "Wrote run outputs"
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.document);
        eprintln!("{}", render_summary(&result, &recorder));
    }

    Ok(result.status.exit_code())
}

/// `--prompt` wins, then `--payload` (file or `-` for stdin). No input at all
/// means the defaults.
async fn read_payload(path: Option<&Path>, prompt: Option<&str>) -> Result<Value> {
    if let Some(prompt) = prompt {
        return Ok(Value::String(prompt.to_string()));
    }
    let Some(path) = path else {
        return Ok(Value::Null);
    };

    let raw = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read payload from stdin")?;
        buffer
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read payload file {}", path.display()))?
    };

    // Non-JSON text is treated as a natural-language request.
    Ok(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
}
