use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use prometheus::Registry;
use tokio::sync::mpsc;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vpncheck::{
    Error,
    actors::{
        collector::GaugeCollector, group::Group, monitor::StateMonitor, poller::Poller,
        shutdown::ShutdownActor, updater::UpdaterStage,
    },
    api::{ApiServer, ApiState},
    config::{get_source_token, read_config_file},
    metrics::PrometheusSink,
    source::HttpTelemetrySource,
    state::{SharedState, UtcClock},
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Log everything down to trace level
    #[arg(long)]
    debug: bool,
}

fn init(debug: bool) {
    let level = if debug {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("vpncheck", level),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.debug);
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?.with_env_token(get_source_token());

    let registry = Registry::new();
    let sink = PrometheusSink::tunnel_up(&registry).context("failed to register gauges")?;
    let (collector, collector_handle) = GaugeCollector::new(Arc::new(sink));
    let state = SharedState::new();

    let (status_tx, status_rx) = mpsc::channel(1);
    let (vpn_updates_tx, vpn_updates_rx) = mpsc::channel(1);

    let source = HttpTelemetrySource::new(&config.source)?;
    let server = ApiServer::bind(
        config.listen,
        ApiState::new(collector_handle.clone(), state.clone()),
    )
    .await?;
    let shutdown = ShutdownActor::from_os_signals().context("failed to install signal handlers")?;

    let mut group = Group::new();
    group
        .add(shutdown)
        .add(collector)
        .add(StateMonitor::new(
            Arc::new(UtcClock),
            Arc::new(state),
            vpn_updates_rx,
        ))
        .add(UpdaterStage::new(
            Arc::new(collector_handle),
            status_rx,
            vpn_updates_tx,
        ))
        .add(Poller::new(Arc::new(source), status_tx, config.interval()))
        .add(server);

    info!(
        "polling {} every {:?}, serving on {}",
        config.source.url,
        config.interval(),
        config.listen
    );

    match group.run().await {
        Ok(()) => info!("actors stopped"),
        Err(Error::Signal(signal)) => info!("received signal {signal}, shut down cleanly"),
        Err(e) => {
            error!("actors stopped with error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}
