//! Stratus CLI entry point.

use stratus_lib::cli::{self, Cli};
use stratus_lib::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli::execute(cli).await
}
