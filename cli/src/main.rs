use anyhow::Context;
use clap::Parser;
use prospect_app::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    prospect_app::init_tracing();

    let json = cli.json;
    match prospect_app::run(cli).await {
        Ok(()) => Ok(()),
        Err(err) if json => {
            let text = serde_json::to_string_pretty(&err).context("serialize error")?;
            println!("{text}");
            std::process::exit(1);
        }
        Err(err) => Err(err).context("prospect failed"),
    }
}
