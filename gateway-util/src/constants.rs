// Service names
pub const LEDGER_GATEWAY_SERVICE_NAME: &str = "ledger-gateway";
pub const LEDGER_GATEWAY_CLI_TOOL_NAME: &str = "ledger-gateway-cli";

// Directory constants
pub const LEDGER_GATEWAY_ROOT_DIR: &str = ".ledger-gateway";

// Service http ports
pub const LEDGER_GATEWAY_SERVICE_HTTP_PORT: u16 = 8098;
