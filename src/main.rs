use std::net::TcpListener;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use chain_ofp::ofp_controller::openflow0x01::Connection;
use chain_ofp::{ChainController, ControllerConfig};

#[derive(Parser)]
#[command(name = "chain_ofp_controller")]
#[command(about = "OpenFlow 1.0 controller: learning switch with service-chain steering", long_about = None)]
struct Cli {
    /// Deployment configuration (TOML); defaults are used if the file is missing
    #[arg(long, value_name = "PATH", default_value = "chain_ofp.toml")]
    config: PathBuf,
    /// Listen address, overriding the configuration
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    if let Err(err) = run(cli) {
        error!("{:#}", err);
        eprintln!("chain_ofp_controller error: {err:?}");
        exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ControllerConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let engine = Arc::new(config.engine()?);
    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).with_context(|| format!("binding {}", addr))?;
    info!(%addr, "listening for switches");

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
        let engine = engine.clone();
        std::thread::spawn(move || {
            let _span = info_span!("connection", %peer).entered();
            let mut controller = ChainController::new(engine);
            let mut conn = Connection::new(stream);
            match conn.run(&mut controller) {
                Ok(()) => info!("connection closed"),
                Err(e) => warn!(error = %e, "connection failed"),
            }
        });
    }
    Ok(())
}
