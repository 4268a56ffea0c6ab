use clap::Parser;
use swesh_tui::Cli;
use swesh_tui::run_main;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let exit_info = run_main(cli).await?;
    println!("Exit status: {}", exit_info.exit_status);
    if !exit_info.result.is_empty() {
        println!("{}", exit_info.result);
    }
    Ok(())
}
