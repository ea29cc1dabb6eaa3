use clap::Parser;
use podstamp::client::KubePodClient;
use podstamp::config::FilterConfig;
use podstamp::{controller, probes, Error};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Required pod annotation as key=value (empty disables the check)
    #[arg(long, env = "WATCH_ANNOTATION", default_value = "")]
    watch_annotation: String,

    /// Comma-separated namespace allow-list (empty disables the check)
    #[arg(long, env = "WATCH_NAMESPACES", default_value = "")]
    watch_namespaces: String,

    /// Number of concurrent reconcile workers
    #[arg(long, env = "WORKERS", default_value_t = 2)]
    workers: usize,

    /// The address the probe and metrics endpoints bind to
    #[arg(long, env = "PROBE_BIND_ADDRESS", default_value = "0.0.0.0:8081")]
    probe_bind_address: std::net::SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    info!("Starting podstamp controller v{}", env!("CARGO_PKG_VERSION"));

    let config = FilterConfig::parse(&args.watch_annotation, &args.watch_namespaces)?;
    info!(
        namespaces = ?config.namespaces,
        annotation = ?config.annotation,
        workers = args.workers,
        "Watch configuration loaded"
    );

    let client = kube::Client::try_default()
        .await
        .map_err(Error::KubeError)?;

    info!("Connected to Kubernetes cluster");

    let probe_addr = args.probe_bind_address;
    tokio::spawn(async move {
        if let Err(e) = probes::run_server(probe_addr).await {
            warn!("Probe server error: {:?}", e);
        }
    });

    let events = controller::pod_events(client.clone());
    let pods = KubePodClient::new(client);

    controller::run_controller(events, pods, config, args.workers, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
