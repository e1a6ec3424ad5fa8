use clap::Parser;
use letterman::compile::{CompileQueue, LatexCompileClient, LoggingListener, QueueOptions};
use letterman::{AppError, CiviCrmClient, CliArgs, Config, InvoiceRun};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let args = CliArgs::parse();

    if let Err(e) = run(args).await {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(args: CliArgs) -> Result<(), AppError> {
    // An unknown mode ends the run here, before any I/O
    let mode = args.run_mode()?;
    if args.mode.is_some() {
        tracing::info!("{}", mode.describe());
    } else {
        tracing::info!("No parameter found. {}", mode.describe());
    }
    let selection = mode.selection();

    let config = Config::from_env()?;

    let http = reqwest::Client::new();
    let source = Arc::new(CiviCrmClient::new(
        http.clone(),
        &config.civicrm_server,
        &config.civicrm_path,
        config.civicrm_site_key.clone(),
        config.civicrm_api_key.clone(),
        config.membership_type.clone(),
    ));

    let queue = CompileQueue::start(
        Arc::new(LatexCompileClient::new(http)),
        Arc::new(LoggingListener),
        QueueOptions {
            workers: config.queue_workers,
            download_timeout: config.download_timeout,
        },
    );

    let invoice_run = InvoiceRun::new(source, &config);
    invoice_run.run(&selection, &queue).await?;

    // Pagination is done; let the queued letters finish
    queue.shutdown().await;
    Ok(())
}
