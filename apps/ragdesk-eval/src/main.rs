use clap::Parser;

use ragdesk_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	ragdesk_eval::run(args).await
}
