use anyhow::Result;
use env_logger::Env;
use vcsreport::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::init_from_env(Env::default().default_filter_or(cli.log_filter()));
    cli.execute()
}
