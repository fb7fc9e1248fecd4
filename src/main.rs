use anyhow::Context;
use overlap_cleaner::{
    cli::args_from_env,
    config::Config,
    logging::init_tracing,
    overlap::OverlapTestRegistry,
    runner::{CleaningRunner, run_stream},
};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader, BufWriter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = args_from_env()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let logging_guard = init_tracing(&config.logging)?;

    let registry = OverlapTestRegistry::with_builtin();
    let mut runner = CleaningRunner::from_pipelines(&config.pipelines, &registry)
        .context("failed to construct cleaning pipelines")?;

    tracing::info!(
        target: "main",
        run_id = %logging_guard.run_id(),
        config = %args.config_path.display(),
        pipelines = ?runner.pipeline_names(),
        on_event_error = ?config.runner.on_event_error,
        "run_started"
    );

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.events_path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open events {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut writer: Box<dyn AsyncWrite + Unpin + Send> = match &args.output_path {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("failed to create output {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(tokio::io::stdout())),
    };

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(target: "main", error = %err, "ctrl_c_listener_failed");
            std::future::pending::<()>().await;
        }
        tracing::info!(target: "main", "shutdown_requested");
    };

    let report = run_stream(
        &mut runner,
        reader,
        &mut writer,
        config.runner.on_event_error,
        shutdown,
    )
    .await?;

    tracing::info!(
        target: "main",
        events_read = report.events_read,
        events_written = report.events_written,
        events_skipped = report.events_skipped,
        interrupted = report.interrupted,
        "run_finished"
    );
    Ok(())
}
