#[macro_use]
extern crate log;

use clap::Parser;
use gateway_util::LogConfig;
use ledger_gateway::config::GatewayConfig;
use ledger_gateway::{LedgerGateway, LedgerGatewayRpcServer};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "ledger-gateway")]
#[command(version = "0.1.0")]
#[command(about = "Caching query gateway in front of ledger nodes", long_about = None)]
struct LedgerGatewayCli {
    /// Run the service in daemon mode
    #[arg(short, long)]
    daemon: bool,
}

#[tokio::main]
async fn main_run() {
    let _lock = match gateway_util::init_process_lock(gateway_util::LEDGER_GATEWAY_SERVICE_NAME) {
        Ok(lock) => lock,
        Err(e) => {
            println!("Failed to acquire process lock: {}", e);
            std::process::exit(1);
        }
    };

    // Init file logging
    let config = LogConfig::new(gateway_util::LEDGER_GATEWAY_SERVICE_NAME).enable_console(false);
    let _logger = match gateway_util::init_log(config) {
        Ok(handle) => handle,
        Err(e) => {
            println!("Failed to init logging: {}", e);
            std::process::exit(1);
        }
    };

    let root_dir = gateway_util::get_service_dir(gateway_util::LEDGER_GATEWAY_SERVICE_NAME);
    info!("Using service directory: {}", root_dir.display());
    println!("Using service directory: {}", root_dir.display());

    // Load configuration
    let config = match GatewayConfig::load(&root_dir) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config: {}", e);
            println!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    let config = Arc::new(config);

    let gateway = match LedgerGateway::new(config.clone()) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!("Failed to create gateway: {}", e);
            println!("Failed to create gateway: {}", e);
            std::process::exit(1);
        }
    };
    println!(
        "Gateway created with {} backend endpoint(s)",
        config.endpoints.len()
    );
    gateway.start().await;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(());

    let feed_task = {
        let gateway = gateway.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { gateway.run(shutdown_rx).await })
    };

    // Start the RPC server
    let rpc_server = match LedgerGatewayRpcServer::start(gateway.clone(), shutdown_tx.clone()) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start RPC server: {}", e);
            println!("Failed to start RPC server: {}", e);
            std::process::exit(1);
        }
    };
    println!(
        "RPC server started at http://127.0.0.1:{}",
        config.rpc_server.port
    );

    use tokio::signal;
    let sigint = signal::ctrl_c();

    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to create SIGTERM signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    // On non-Unix systems, we only rely on Ctrl+C
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = sigint => {
            info!("Received Ctrl+C, shutting down...");
            println!("Shutting down...");
        }
        _ = sigterm => {
            info!("Received SIGTERM, shutting down...");
            println!("Shutting down...");
        }
        _ = shutdown_rx.changed() => {
            info!("Shutdown signal received from RPC, shutting down...");
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
    }

    // Cleanup on shutdown
    let _ = shutdown_tx.send(());
    match feed_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Gateway feed exited with error: {}", e),
        Err(e) => error!("Gateway feed task failed: {}", e),
    }

    rpc_server.close().await;

    println!("Shutdown complete.");

    // Sleep a moment to ensure all logs are flushed
    tokio::time::sleep(std::time::Duration::from_millis(1000)).await;
}

fn main() {
    let cli = LedgerGatewayCli::parse();

    // Fork before the runtime starts any threads
    if cli.daemon {
        if let Err(e) =
            ledger_gateway::tool::daemonize_process(gateway_util::LEDGER_GATEWAY_SERVICE_NAME)
        {
            println!("{}", e);
            std::process::exit(1);
        }
    }

    main_run();
    println!("Ledger gateway service exited.");
}
