use clap::Subcommand;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Print the effective configuration (secrets omitted)")]
    Show,

    #[command(about = "Check the configuration the server would start with")]
    Validate,
}

pub async fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config();

    match cmd {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
            Ok(())
        }
        ConfigCommands::Validate => {
            config.validate().map_err(anyhow::Error::msg)?;
            output_success(&output_format, "configuration is valid", None)
        }
    }
}
