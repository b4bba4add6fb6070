pub mod line;
pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::eyre;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = ragdesk_cli::VERSION,
	rename_all = "kebab",
	styles = ragdesk_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = ragdesk_config::load(&args.config)?;

	init_tracing(&config)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse()?;

	if !admin_addr.ip().is_loopback() {
		return Err(eyre::eyre!("admin_bind must be a loopback address."));
	}

	let state = AppState::new(config).await?;

	if state.line.is_none() {
		tracing::info!("LINE channel not configured. Webhook route will answer 404.");
	}

	let http_listener = bind("HTTP", http_addr).await?;
	let admin_listener = bind("Admin", admin_addr).await?;

	tokio::try_join!(
		axum::serve(http_listener, routes::router(state.clone())),
		axum::serve(admin_listener, routes::admin_router(state)),
	)?;

	Ok(())
}

async fn bind(label: &str, addr: SocketAddr) -> color_eyre::Result<TcpListener> {
	let listener = TcpListener::bind(addr)
		.await
		.map_err(|err| eyre::eyre!("{label} server could not bind {addr}: {err}"))?;

	tracing::info!(%addr, "{label} server listening.");

	Ok(listener)
}

fn init_tracing(config: &ragdesk_config::Config) -> color_eyre::Result<()> {
	let filter = EnvFilter::try_new(&config.service.log_level)
		.or_else(|_| EnvFilter::try_new("info"))?;

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.try_init()
		.map_err(|err| eyre::eyre!("Failed to install tracing subscriber: {err}"))?;

	Ok(())
}
