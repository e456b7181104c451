//! Configuration validation utility
//!
//! Usage: cargo run --bin validate-config config/quoting.toml

use std::env;
use std::process;

use quoting_config::ConfigLoader;

#[tokio::main]
async fn main() {
	let args: Vec<String> = env::args().collect();

	if args.len() != 2 {
		eprintln!("Usage: {} <config-file>", args[0]);
		process::exit(1);
	}

	let config_path = &args[1];

	println!("Validating configuration file: {}", config_path);

	match ConfigLoader::new().with_file(config_path).load().await {
		Ok(config) => {
			println!("✅ Configuration is valid!");
			println!("Service name: {}", config.service.name);
			println!("Pass-through mode: {}", config.service.pass_through_mode);
			println!("Storage backend: {}", config.storage.backend);
			println!("Participants backend: {}", config.participants.backend);
			println!("Account lookup backend: {}", config.account_lookup.backend);
			println!("Scheme currencies: {:?}", config.scheme_rules.currencies);
		}
		Err(e) => {
			eprintln!("❌ Configuration validation failed:");
			eprintln!("{}", e);
			process::exit(1);
		}
	}
}
