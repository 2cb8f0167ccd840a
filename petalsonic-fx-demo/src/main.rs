mod cli;
mod host;

fn main() -> anyhow::Result<()> {
    let Some(options) = cli::parse_args(std::env::args().skip(1))? else {
        cli::print_usage();
        return Ok(());
    };

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    host::run(&options)
}
