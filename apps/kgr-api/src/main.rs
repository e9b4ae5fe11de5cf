use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = kgr_api::Args::parse();

	kgr_api::run(args).await
}
