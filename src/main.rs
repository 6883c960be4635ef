use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use matrix_hash_challenge::config::{Config, Disclosure};
use matrix_hash_challenge::server;

#[derive(Parser, Debug)]
#[command(author, version, about = "Length-restricted hash collision challenge server", long_about = None)]
struct Args {
	/// JSON configuration file; every field is optional
	#[arg(short, long)]
	config: Option<PathBuf>,

	#[arg(long)]
	listen: Option<SocketAddr>,

	#[arg(short, long)]
	port: Option<u16>,

	/// Longest accepted candidate, in 16-byte blocks
	#[arg(long)]
	max_blocks: Option<usize>,

	/// Number of leaked (x, f(x)) pairs per session
	#[arg(long)]
	pairs: Option<usize>,

	#[arg(long)]
	timeout_secs: Option<u64>,

	#[arg(long, value_enum)]
	disclosure: Option<Disclosure>,
}

impl Args {
	fn into_config(self) -> matrix_hash_challenge::Result<Config> {
		let mut config = match &self.config {
			Some(path) => Config::from_file(path)?,
			None => Config::default(),
		};
		if let Some(listen) = self.listen {
			config.listen = listen;
		}
		if let Some(port) = self.port {
			config.listen.set_port(port);
		}
		if let Some(max_blocks) = self.max_blocks {
			config.challenge.max_blocks = max_blocks;
		}
		if let Some(pairs) = self.pairs {
			config.challenge.pair_count = pairs;
		}
		if let Some(timeout_secs) = self.timeout_secs {
			config.timeout_secs = timeout_secs;
		}
		if let Some(disclosure) = self.disclosure {
			config.challenge.disclosure = disclosure;
		}
		Ok(config)
	}
}

/// Resolves on ctrl-c. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		error!(%err, "cannot listen for ctrl-c; running until killed");
		std::future::pending::<()>().await;
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let res = match Args::parse().into_config() {
		Ok(config) => server::run(config, shutdown_signal()).await,
		Err(err) => Err(err),
	};
	match res {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!(%err, "server stopped");
			ExitCode::FAILURE
		}
	}
}
