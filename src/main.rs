mod cli;

use cli::cli;
use fundwatch::services::{
    files::create_necessary_directories,
    shared::{env::check_for_env_variables, logger::init_logger},
};

async fn run_fundwatch() -> anyhow::Result<()> {
    init_logger();
    check_for_env_variables();
    create_necessary_directories()?;
    cli().await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    run_fundwatch().await?;
    Ok(())
}
