use std::sync::Arc;

use pingora::services::{background::background_service, listening::Service};
use pingora_core::server::{configuration::Opt, Server};

use traefik_dashboard::{
    config::{Config, TRAEFIK_API_ENV},
    core::RouterStore,
    icons::IconResolver,
    logging::LogSink,
    poller::RouterPoller,
    render::HtmlRenderer,
    service::DashboardHttpApp,
    traefik::TraefikClient,
};

fn main() {
    // Read command-line arguments
    let opt = Opt::parse_args();

    // Load configuration with file, command line and environment overrides
    let config = match Config::load_with_opt_override(&opt) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    let log_sink = if let Some(log_cfg) = &config.log {
        let sink = LogSink::new(log_cfg.clone());
        sink.init_env_logger();
        Some(sink)
    } else {
        env_logger::init();
        None
    };

    if config.traefik.api.is_none() {
        log::error!("{TRAEFIK_API_ENV} environment variable must be set");
        log::error!("Example: http://traefik:8080");
    }

    let client = match config
        .traefik
        .api
        .as_deref()
        .map(|api| TraefikClient::new(api, config.traefik.timeout()))
        .transpose()
    {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to create Traefik client: {e}");
            std::process::exit(1);
        }
    };

    let icons = if config.icons.enabled {
        match IconResolver::new(&config.icons) {
            Ok(icons) => Some(Arc::new(icons)),
            Err(e) => {
                log::error!("Failed to create icon resolver: {e}");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let store = Arc::new(RouterStore::new());
    let address = config.listener.address();

    if let Err(e) = check_bind(&address, opt.upgrade) {
        log::error!("Error starting server on {address}: {e}");
        std::process::exit(1);
    }

    let mut poller = RouterPoller::new(client.clone(), store.clone())
        .with_interval(config.traefik.poll_interval());
    if let Some(icons) = &icons {
        poller = poller.with_icons(icons.clone());
    }

    let dashboard = DashboardHttpApp::new(store, client, Box::new(HtmlRenderer::default()), icons)
        .dashboard_http_service(&address);

    // Create Pingora server with optional configuration
    let mut server = Server::new_with_opt_and_conf(Some(opt), config.pingora);

    log::info!("Bootstrapping...");
    server.bootstrap();

    if let Some(sink) = log_sink {
        log::info!("Adding log sink service...");
        server.add_service(sink);
    }

    if let Some(prometheus_cfg) = &config.prometheus {
        log::info!("Adding Prometheus HTTP on {}...", prometheus_cfg.address);
        let mut prometheus_service_http = Service::prometheus_http_service();
        prometheus_service_http.add_tcp(&prometheus_cfg.address.to_string());
        server.add_service(prometheus_service_http);
    }

    log::info!("Adding router poller...");
    server.add_service(background_service("traefik router poller", poller));

    log::info!("Starting server on {address}");
    server.add_service(dashboard);
    server.run_forever();
}

/// Fails early if `address` cannot be bound, since pingora binds later inside
/// a service thread where a failure would not stop the process. Skipped on
/// upgrade, when the old process still holds the socket.
fn check_bind(address: &str, upgrade: bool) -> std::io::Result<()> {
    if upgrade {
        return Ok(());
    }
    std::net::TcpListener::bind(address).map(|_| ())
}
