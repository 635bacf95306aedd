use clap::Parser;

mod cli;
mod i2c;
mod util;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    i2c::action(&cli)
}
