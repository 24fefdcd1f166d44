use clap::CommandFactory;

use checkkit::config_export;
use checkkit::didactum::DidactumSensors;
use checkkit::raritan::{RaritanPduInlet, RaritanSensors};
use checkkit::Registry;

#[derive(clap::Parser)]
struct Cli {
    /// Name of the check plugin to run
    #[clap(long)]
    plugin: String,
    /// Item of the service to check
    #[clap(long)]
    item: Option<String>,
    /// File with the raw section data
    #[clap(long, default_value = "walk.txt")]
    walk: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set the GENERATE_ICINGA_COMMAND environment variable to dump the
    // command configuration derived from the CLI definition.
    config_export::print_command_config_if_env_and_exit("checkkit", &Cli::command())?;

    // Otherwise print one CheckCommand per registered plugin.
    let mut registry = Registry::new();
    registry.register(Box::new(RaritanSensors::default()))?;
    registry.register(Box::new(RaritanPduInlet::default()))?;
    registry.register(Box::new(DidactumSensors::default()))?;

    println!("{}", config_export::registry_config(&registry)?);
    Ok(())
}
