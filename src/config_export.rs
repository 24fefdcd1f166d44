//! Exports Icinga CheckCommand configuration for registered plugins, so
//! the host side does not have to be written by hand.

use std::io;

use crate::registry::{CheckPlugin, Registry};

#[derive(Debug, thiserror::Error)]
pub enum ConfigExportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid executable path")]
    InvalidExecutablePath,
    #[error("missing long option name")]
    MissingLongOption,
}

/// One argument of a CheckCommand: the flag, the Icinga custom variable
/// feeding it and an optional default.
#[derive(Clone, Debug)]
pub struct CommandArgument {
    pub name: String,
    pub variable: String,
    pub description: Option<String>,
    pub is_flag: bool,
    pub default_value: Option<String>,
}

/// A CheckCommand definition in the making.
#[derive(Clone, Debug)]
pub struct IcingaCommand {
    name: String,
    executable: String,
    arguments: Vec<CommandArgument>,
}

impl IcingaCommand {
    /// Builds the command definition for one registered plugin: the
    /// current executable plus the standard plugin/item/walk-file
    /// arguments, with the plugin name pre-seeded as a default.
    pub fn for_plugin(plugin: &dyn CheckPlugin) -> Result<IcingaCommand, ConfigExportError> {
        let executable = std::env::current_exe()?
            .to_str()
            .ok_or(ConfigExportError::InvalidExecutablePath)?
            .to_owned();

        Ok(IcingaCommand {
            name: format!("checkkit-{}", plugin.name()),
            executable,
            arguments: vec![
                CommandArgument {
                    name: "--plugin".to_owned(),
                    variable: "checkkit_plugin".to_owned(),
                    description: Some("Name of the check plugin to run".to_owned()),
                    is_flag: false,
                    default_value: Some(plugin.name().to_owned()),
                },
                CommandArgument {
                    name: "--item".to_owned(),
                    variable: "checkkit_item".to_owned(),
                    description: Some("Item of the service to check".to_owned()),
                    is_flag: false,
                    default_value: None,
                },
                CommandArgument {
                    name: "--walk".to_owned(),
                    variable: "checkkit_walk".to_owned(),
                    description: Some("File with the raw section data".to_owned()),
                    is_flag: false,
                    default_value: None,
                },
            ],
        })
    }

    /// Renders the `object CheckCommand` block.
    pub fn render(&self) -> String {
        let mut out = format!("object CheckCommand \"{}\" {{\n", self.name);
        out.push_str(&format!("  command = [ \"{}\" ]\n", self.executable));
        out.push_str("  arguments = {\n");
        for arg in &self.arguments {
            out.push_str(&format!("  \"{}\" = {{\n", arg.name));
            if arg.is_flag {
                out.push_str(&format!("    set_if = \"${}$\"\n", arg.variable));
            } else {
                out.push_str(&format!("    value = \"${}$\"\n", arg.variable));
            }
            if let Some(description) = &arg.description {
                out.push_str(&format!(
                    "    description = \"{}\"\n",
                    escape_string(description)
                ));
            }
            out.push_str("  }\n");
        }
        out.push_str("  }\n");

        for arg in &self.arguments {
            if let Some(default_value) = &arg.default_value {
                out.push_str(&format!(
                    "  vars.{} = \"{}\"\n",
                    arg.variable,
                    escape_string(default_value)
                ));
            }
        }

        out.push_str("}\n");
        out
    }
}

/// Renders the CheckCommand definitions for every plugin in the
/// registry.
pub fn registry_config(registry: &Registry) -> Result<String, ConfigExportError> {
    let mut out = String::new();
    for plugin in registry.plugins() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&IcingaCommand::for_plugin(plugin)?.render());
    }
    Ok(out)
}

fn escape_string(s: &str) -> String {
    s.replace('"', "\\\"").replace('$', "\\$")
}

#[cfg(feature = "clap")]
mod clap_support {
    use super::{CommandArgument, ConfigExportError, IcingaCommand};

    impl IcingaCommand {
        /// Builds a command definition from a clap declaration, for
        /// standalone check binaries with their own CLI.
        pub fn from_clap(
            name: &str,
            cmd: &clap::Command,
        ) -> Result<IcingaCommand, ConfigExportError> {
            let executable = std::env::current_exe()?
                .to_str()
                .ok_or(ConfigExportError::InvalidExecutablePath)?
                .to_owned();

            let mut arguments = Vec::new();
            for arg in cmd.get_arguments() {
                let long = arg
                    .get_long()
                    .ok_or(ConfigExportError::MissingLongOption)?
                    .to_owned();
                let variable = format!("{}_{}", name, long.replace('-', "_"));

                let is_flag = {
                    let values = arg.get_possible_values();
                    values.len() == 2
                        && values.iter().any(|v| v.get_name() == "true")
                        && values.iter().any(|v| v.get_name() == "false")
                };

                arguments.push(CommandArgument {
                    name: format!("--{}", long),
                    variable,
                    description: arg.get_help().map(|s| s.to_string()),
                    is_flag,
                    default_value: arg
                        .get_default_values()
                        .first()
                        .and_then(|v| v.to_str())
                        .map(str::to_owned),
                });
            }

            Ok(IcingaCommand {
                name: name.to_owned(),
                executable,
                arguments,
            })
        }
    }

    /// Prints the Icinga command configuration and exits if the
    /// GENERATE_ICINGA_COMMAND environment variable is set.
    pub fn print_command_config_if_env_and_exit(
        name: &str,
        cmd: &clap::Command,
    ) -> Result<(), ConfigExportError> {
        if std::env::var("GENERATE_ICINGA_COMMAND").is_err() {
            return Ok(());
        }

        let command = IcingaCommand::from_clap(name, cmd)?;
        println!("{}", command.render().trim());
        std::process::exit(0);
    }
}

#[cfg(feature = "clap")]
pub use clap_support::print_command_config_if_env_and_exit;
