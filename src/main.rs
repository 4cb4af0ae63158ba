use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = shadowtee::cli::Cli::parse();
    if let Err(e) = shadowtee::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
