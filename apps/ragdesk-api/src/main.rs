use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = ragdesk_api::Args::parse();

	ragdesk_api::run(args).await
}
