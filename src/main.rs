#[cfg(not(target_arch = "wasm32"))]
mod cli;

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = cli::Cli::parse();
    ollama_translator::logger::init(cli.verbose);
    log::debug!("Starting {:?}", std::env::args().collect::<Vec<_>>());

    cli::run(cli).await
}

// The browser build only ships the library; see `ollama_translator::web`.
#[cfg(target_arch = "wasm32")]
fn main() {}
