use clap::Parser;
use fieldperm_cli::{CliArgs, FieldpermCli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let cli = FieldpermCli::from_args("fieldperm", &args)?;
    cli.run(args).await?;
    Ok(())
}
