//! markitdown-mcp-launcher CLI
//!
//! Zero-install entry point for the MarkItDown MCP server:
//! - Finds Python 3.10+ on the host
//! - Provisions a reusable virtual environment once
//! - Runs the server with stdio and signals relayed to it

use std::env;
use std::process;

use markitdown_mcp_launcher::{
    args_parser::{classify, parse_args, Mode},
    config::LaunchConfig,
    launcher::prepare_environment,
    logging,
    supervisor,
    usage::print_usage,
};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(&args);
    let mode = classify(&options);

    // Help never touches the filesystem or spawns anything
    if mode == Mode::Help {
        print_usage();
        process::exit(0);
    }

    let config = LaunchConfig::from_env();
    logging::init(mode, &config);
    tracing::info!("MarkItDown MCP launcher ({} mode)", mode);

    let env_path = match prepare_environment(&config, mode) {
        Ok(path) => path,
        Err(e) => {
            logging::report_fatal(&e);
            process::exit(1);
        }
    };

    supervisor::run(&env_path, &config, &options, mode);
}
