mod client;
mod cmd;
mod gateway_service;

use clap::Parser;
use cmd::Cli;
use gateway_service::GatewayService;

#[tokio::main]
async fn main() {
    let log_config = gateway_util::LogConfig::new(gateway_util::LEDGER_GATEWAY_CLI_TOOL_NAME)
        .enable_file(false)
        .enable_console(true);

    let _logger = match gateway_util::init_log(log_config) {
        Ok(handle) => handle,
        Err(e) => {
            println!("Failed to init logging: {}", e);
            std::process::exit(1);
        }
    };

    let cli = Cli::parse();
    let service = match GatewayService::new(&cli.url).await {
        Ok(service) => service,
        Err(e) => {
            println!("Failed to connect to ledger gateway: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = service.process_command(cli).await {
        let msg = format!("Error processing command: {}", e);
        println!("{}", msg);
        std::process::exit(1);
    }
}
