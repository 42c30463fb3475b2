//! Command line definition

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Build the `folio` command
#[must_use]
pub fn command() -> Command {
    Command::new("folio")
        .version(crate::VERSION)
        .about("Inspect Folio repositories, plugin configuration and expressions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("settings")
                .long("settings")
                .short('s')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Settings file (TOML)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging for folio crates"),
        )
        .subcommand(
            Command::new("eval")
                .about("Evaluate an expression for a user")
                .arg(Arg::new("expression").required(true).help("Expression to evaluate"))
                .arg(
                    Arg::new("user")
                        .long("user")
                        .short('u')
                        .required(true)
                        .help("User bound as `user`"),
                )
                .arg(
                    Arg::new("users")
                        .long("users")
                        .value_parser(value_parser!(PathBuf))
                        .help("User records (YAML list of id and groups)"),
                )
                .arg(
                    Arg::new("default")
                        .long("default")
                        .value_parser(value_parser!(bool))
                        .help("Evaluate as a condition, falling back to this value"),
                ),
        )
        .subcommand(
            Command::new("lookup")
                .about("Print the tree path from a root to a node")
                .arg(
                    Arg::new("fixture")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Content fixture (YAML)"),
                )
                .arg(Arg::new("root").required(true).help("Tree root path"))
                .arg(Arg::new("target").required(true).help("Target node path")),
        )
        .subcommand(
            Command::new("config")
                .about("Print a plugin configuration with placeholders resolved")
                .arg(
                    Arg::new("config")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Plugin configuration (YAML or JSON)"),
                )
                .arg(
                    Arg::new("fallback")
                        .long("fallback")
                        .short('f')
                        .value_parser(value_parser!(PathBuf))
                        .help("Configuration resolving `${key}` placeholders"),
                )
                .arg(Arg::new("key").long("key").short('k').help("Print only this key")),
        )
        .subcommand(
            Command::new("observe")
                .about("Apply scripted changes and print the tree events they cause")
                .arg(
                    Arg::new("fixture")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Content fixture (YAML)"),
                )
                .arg(Arg::new("root").required(true).help("Observed tree root path"))
                .arg(
                    Arg::new("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Operations to apply (YAML list)"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let matches = command()
            .try_get_matches_from(["folio", "eval", "true", "--user", "editor", "-v"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
        let Some(("eval", args)) = matches.subcommand() else {
            panic!("expected eval");
        };
        assert_eq!(args.get_one::<String>("user").map(String::as_str), Some("editor"));
        assert_eq!(args.get_one::<bool>("default"), None);
    }

    #[test]
    fn default_parses_as_bool() {
        let matches = command()
            .try_get_matches_from(["folio", "eval", "x", "-u", "a", "--default", "true"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<bool>("default"), Some(&true));

        assert!(command()
            .try_get_matches_from(["folio", "eval", "x", "-u", "a", "--default", "maybe"])
            .is_err());
    }
}
