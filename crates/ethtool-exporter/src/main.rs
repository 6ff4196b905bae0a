//! ethtool-exporter - Prometheus exporter for `ethtool -S` NIC statistics.
//!
//! Every scrape of the telemetry path enumerates `/sys/class/net`, runs
//! `ethtool -S` for each interface and renders the counters as gauges
//! labelled with the interface name.
//!
//! Usage:
//!   ethtool-exporter                                   # listen on :9490
//!   ethtool-exporter --web.listen-address 127.0.0.1:9490
//!   ethtool-exporter --collector.interface-filter skip-virtual -v

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod handlers;
mod state;

use std::path::PathBuf;
use std::process;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use ethtool_exporter_core::collector::sysfs::DEFAULT_NET_PATH;
use ethtool_exporter_core::collector::{
    Collector, InterfaceFilter, RealFs, RealRunner, check_version, locate_ethtool,
};
use ethtool_exporter_core::exporter::Exporter;

use state::AppState;

// ============================================================
// CLI
// ============================================================

/// Prometheus exporter for ethtool NIC statistics.
#[derive(Parser)]
#[command(
    name = "ethtool-exporter",
    about = "Prometheus exporter for ethtool -S statistics",
    version = ethtool_exporter_core::VERSION
)]
struct Args {
    /// Address on which to expose metrics and web interface.
    /// A bare ":port" listens on all interfaces.
    #[arg(
        long = "web.listen-address",
        default_value = ":9490",
        env = "ETHTOOL_EXPORTER_LISTEN"
    )]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(
        long = "web.telemetry-path",
        default_value = "/metrics",
        env = "ETHTOOL_EXPORTER_TELEMETRY_PATH"
    )]
    telemetry_path: String,

    /// Path to the ethtool binary. Probed in well-known locations if unset.
    #[arg(long = "ethtool.path", value_name = "PATH", env = "ETHTOOL_EXPORTER_ETHTOOL")]
    ethtool_path: Option<PathBuf>,

    /// Directory listing the network interfaces.
    #[arg(
        long = "sysfs.net-path",
        default_value = DEFAULT_NET_PATH,
        env = "ETHTOOL_EXPORTER_NET_PATH"
    )]
    net_path: PathBuf,

    /// Which interfaces to collect: all, skip-symlinks or skip-virtual.
    #[arg(
        long = "collector.interface-filter",
        default_value = "all",
        env = "ETHTOOL_EXPORTER_INTERFACE_FILTER"
    )]
    interface_filter: InterfaceFilter,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================
// Main
// ============================================================

/// Initializes the tracing subscriber with the appropriate log level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["ethtool_exporter", "ethtool_exporter_core"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!(version = ethtool_exporter_core::VERSION, "starting ethtool_exporter");

    if let Err(reason) = validate_telemetry_path(&args.telemetry_path) {
        error!(path = %args.telemetry_path, "invalid telemetry path: {reason}");
        process::exit(1);
    }

    let exporter = match create_exporter(&args) {
        Ok(exporter) => exporter,
        Err(e) => {
            error!(error = %e, "startup failed");
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(args, exporter)) {
        error!(error = %e, "server error");
        process::exit(1);
    }
}

async fn serve(args: Args, exporter: Exporter) -> std::io::Result<()> {
    let state = AppState::new(exporter, &args.telemetry_path);
    let app = build_router(state, &args.telemetry_path);

    let addr = normalize_listen_address(&args.listen_address);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, path = %args.telemetry_path, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

fn build_router(state: AppState, telemetry_path: &str) -> Router {
    Router::new()
        .route(telemetry_path, get(handlers::handle_metrics))
        .route("/", get(handlers::handle_root))
        .route("/health", get(handlers::handle_health))
        .with_state(state)
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Routes served next to the telemetry path.
const FIXED_ROUTES: [&str; 1] = ["/health"];

/// Rejects telemetry paths the router cannot serve as a plain static route.
fn validate_telemetry_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') || path == "/" {
        return Err("must start with '/' and not be the root".into());
    }
    if FIXED_ROUTES.contains(&path) {
        return Err(format!("{path} is already served by the exporter"));
    }
    if path.contains(['{', '}', '*']) || path.split('/').any(|seg| seg.starts_with(':')) {
        return Err("must not contain route parameters or wildcards".into());
    }
    Ok(())
}

/// Turns the Go-style ":9490" shorthand into a bindable address.
fn normalize_listen_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// Resolves and checks `ethtool`, then builds the exporter around it.
fn create_exporter(args: &Args) -> Result<Exporter, Box<dyn std::error::Error>> {
    let fs = RealFs::new();
    let runner = RealRunner::new();
    let ethtool = locate_ethtool(&fs, args.ethtool_path.as_deref())?;
    let version = check_version(&runner, &ethtool)?;
    info!(
        path = %ethtool.display(),
        %version,
        net_path = %args.net_path.display(),
        filter = %args.interface_filter,
        "using ethtool"
    );

    let collector = Collector::new(fs, runner, ethtool)
        .with_net_path(&args.net_path)
        .with_filter(args.interface_filter);
    Ok(Exporter::new(collector)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use ethtool_exporter_core::collector::mock::scenarios;
    use tower::ServiceExt;

    fn test_router(telemetry_path: &str) -> Router {
        let (fs, runner) = scenarios::typical_host();
        let collector = Collector::new(fs, runner, scenarios::ETHTOOL_PATH)
            .with_net_path(scenarios::NET_PATH);
        let exporter = Exporter::new(collector).unwrap();
        build_router(AppState::new(exporter, telemetry_path), telemetry_path)
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String, Option<String>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap(), content_type)
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (status, body, content_type) = get_body(test_router("/metrics"), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/plain"));
        assert!(body.contains("ethtool_rx_errors{interface=\"eth0\"} 42"));
    }

    #[tokio::test]
    async fn test_custom_telemetry_path() {
        let app = test_router("/ethtool");
        let (status, body, _) = get_body(app.clone(), "/ethtool").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ethtool_scrape_collector_success"));

        let (status, _, _) = get_body(app, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_root_links_to_metrics() {
        let (status, body, _) = get_body(test_router("/ethtool"), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<a href=\"/ethtool\">Metrics</a>"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body, _) = get_body(test_router("/metrics"), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[test]
    fn test_normalize_listen_address() {
        assert_eq!(normalize_listen_address(":9490"), "0.0.0.0:9490");
        assert_eq!(normalize_listen_address("127.0.0.1:9490"), "127.0.0.1:9490");
        assert_eq!(normalize_listen_address("[::1]:9490"), "[::1]:9490");
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["ethtool-exporter"]);
        assert_eq!(args.listen_address, ":9490");
        assert_eq!(args.telemetry_path, "/metrics");
        assert_eq!(args.net_path, PathBuf::from("/sys/class/net"));
        assert_eq!(args.interface_filter, InterfaceFilter::All);
        assert!(args.ethtool_path.is_none());
    }

    #[test]
    fn test_args_interface_filter() {
        let args = Args::parse_from([
            "ethtool-exporter",
            "--collector.interface-filter",
            "skip-virtual",
            "-vv",
        ]);
        assert_eq!(args.interface_filter, InterfaceFilter::SkipVirtual);
        assert_eq!(args.verbose, 2);
        assert!(
            Args::try_parse_from(["ethtool-exporter", "--collector.interface-filter", "bogus"])
                .is_err()
        );
    }

    #[test]
    fn test_validate_telemetry_path() {
        for ok in ["/metrics", "/ethtool", "/probe/metrics", "/health/metrics"] {
            assert!(validate_telemetry_path(ok).is_ok(), "{ok}");
        }
        for bad in ["metrics", "/", "/health", "/metrics{", "/{x}", "/*x", "/:x", "/a/:b"] {
            assert!(validate_telemetry_path(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_accepted_paths_build_a_router() {
        for path in ["/metrics", "/probe/metrics", "/health/metrics"] {
            assert!(validate_telemetry_path(path).is_ok());
            let result = std::panic::catch_unwind(|| test_router(path));
            assert!(result.is_ok(), "{path}");
        }
    }

    #[test]
    fn test_missing_ethtool_is_a_startup_error() {
        let args = Args::parse_from([
            "ethtool-exporter",
            "--ethtool.path",
            "/nonexistent/sbin/ethtool",
        ]);
        let err = create_exporter(&args).err().unwrap();
        assert!(err.to_string().contains("/nonexistent/sbin/ethtool"));
    }

    #[tokio::test]
    async fn test_scrape_requests_are_counted() {
        let app = test_router("/metrics");
        get_body(app.clone(), "/metrics").await;
        get_body(app.clone(), "/metrics").await;
        let (_, body, _) = get_body(app, "/metrics").await;
        assert!(body.contains("promhttp_metric_handler_requests_total{code=\"200\"} 2"));
        assert!(body.contains("promhttp_metric_handler_requests_in_flight 1"));
    }
}
