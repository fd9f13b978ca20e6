//! r10k webhook
//!
//! Usage:
//! - Default config: `r10k-webhook`
//! - Custom config: `r10k-webhook --config /etc/puppetlabs/webhook.yaml`
//! - Custom port: `r10k-webhook --port 8099`

use std::path::PathBuf;
use std::process::ExitCode;

use r10k_webhook::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => {
                config.config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--port" | "-p" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("r10k webhook - trigger r10k deployments from Git webhooks");
    println!();
    println!("USAGE:");
    println!("    r10k-webhook [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>    Configuration file (default: /etc/webhook.yaml, env: WEBHOOK_CONFIG)");
    println!("    -p, --port <PORT>      Override the listening port (env: PORT)");
    println!("    -h, --help             Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    WEBHOOK_LOG            Log filter, e.g. `debug` (falls back to RUST_LOG)");
}

fn main() -> ExitCode {
    let config = parse_args();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(r10k_webhook::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
