use clap::Parser;
use lsusb::Config;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "List USB devices.", long_about = None)]
struct Args {
    /// Print all device descriptors
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    // Set up logging, stdout is reserved for the device list
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env(args.verbose);
    debug!(?config, "starting");

    let tally = lsusb::run(&config, &mut std::io::stdout().lock())?;
    debug!(?tally, "done");

    Ok(())
}
