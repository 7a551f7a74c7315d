use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = coderef::Args::parse();
	coderef::run(args).await
}
