// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::error::{CompilerError, Result};
use crate::{CompilerOptions, UrlMode};
use clap::{Arg, ArgAction, Command, ValueEnum};
use std::time::Instant;

pub use config::ConfigFile;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UrlModeArg {
    Absolute,
    Relative,
    Mixed,
}

impl From<UrlModeArg> for UrlMode {
    fn from(arg: UrlModeArg) -> Self {
        match arg {
            UrlModeArg::Absolute => UrlMode::Absolute,
            UrlModeArg::Relative => UrlMode::Relative,
            UrlModeArg::Mixed => UrlMode::Mixed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Css,
    Json,
}

pub struct EnhancedCli {
    config: ConfigFile,
    start_time: Instant,
}

impl Default for EnhancedCli {
    fn default() -> Self {
        Self::new()
    }
}

impl EnhancedCli {
    pub fn new() -> Self {
        Self {
            config: ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_time = Instant::now();
        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"));

        let result = match matches.subcommand() {
            Some(("compile", sub_matches)) => handlers::handle_compile_command(self, sub_matches),
            Some(("check", sub_matches)) => handlers::handle_check_command(self, sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        };
        log::debug!("Finished in {}ms", self.start_time.elapsed().as_millis());
        result
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.json or .toml)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("compile")
                    .about("Compile an SCSS file to CSS")
                    .arg(Arg::new("input").help("Input SCSS file").required(true).index(1))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Output CSS file"))
                    .arg(Arg::new("url-mode").short('u').long("url-mode").value_parser(clap::value_parser!(UrlModeArg)).help("Url rewriting of imported stylesheets"))
                    .arg(Arg::new("include").short('I').long("include").value_name("DIR").help("Add import search directory").action(ArgAction::Append))
                    .arg(Arg::new("define").short('D').long("define").value_name("NAME=VALUE").help("Define a global variable").action(ArgAction::Append))
                    .arg(Arg::new("stats").long("stats").help("Show detailed compilation statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("css").help("Report format"))
                    .arg(Arg::new("debug").short('d').long("debug").help("Log every compilation phase").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("check")
                    .about("Check SCSS files for errors without writing output")
                    .arg(Arg::new("input").help("Input SCSS file or directory").required(true).index(1))
                    .arg(Arg::new("recursive").short('r').long("recursive").help("Check all SCSS files in directory recursively").action(ArgAction::SetTrue)),
            )
    }

    fn setup_logging(&self, verbose_count: u8) {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        // RUST_LOG wins over the -v count
        let mut builder = env_logger::Builder::new();
        builder.filter_level(log_level).format_timestamp_secs();
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        if builder.try_init().is_err() {
            log::debug!("Logger already initialised");
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Options from the command line, falling back to the config file
    pub fn build_compiler_options(&self, matches: &clap::ArgMatches) -> Result<CompilerOptions> {
        let mut options = CompilerOptions::default();
        options.debug_mode = matches.try_get_one::<bool>("debug").ok().flatten().copied().unwrap_or(false);

        let cli_mode = matches.try_get_one::<UrlModeArg>("url-mode").ok().flatten().copied();
        options.url_mode = match (cli_mode, &self.config.url_mode) {
            (Some(mode), _) => mode.into(),
            (None, Some(name)) => UrlMode::from_name(name).ok_or_else(|| CompilerError::InvalidFormat {
                message: format!("Unknown url mode '{}' in config. Use absolute, relative or mixed.", name),
            })?,
            (None, None) => UrlMode::default(),
        };

        if let Ok(Some(include_dirs)) = matches.try_get_many::<String>("include") {
            options.include_directories.extend(include_dirs.cloned());
        }
        if let Some(config_includes) = &self.config.include_directories {
            options.include_directories.extend(config_includes.iter().cloned());
        }

        if let Ok(Some(defines)) = matches.try_get_many::<String>("define") {
            for define in defines {
                let (name, value) = define.split_once('=').ok_or_else(|| CompilerError::InvalidFormat {
                    message: format!("Invalid variable definition: {}. Use NAME=VALUE format.", define),
                })?;
                options.custom_variables.insert(name.trim().to_string(), value.to_string());
            }
        }
        if let Some(config_vars) = &self.config.custom_variables {
            for (name, value) in config_vars {
                options.custom_variables.entry(name.clone()).or_insert_with(|| value.clone());
            }
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn compile_matches(cli: &EnhancedCli, args: &[&str]) -> clap::ArgMatches {
        let mut argv = vec!["scssc", "compile"];
        argv.extend_from_slice(args);
        let matches = cli.build_cli().try_get_matches_from(argv).unwrap();
        matches.subcommand_matches("compile").unwrap().clone()
    }

    #[test]
    fn test_options_from_command_line() {
        let cli = EnhancedCli::new();
        let matches = compile_matches(
            &cli,
            &["main.scss", "-u", "relative", "-I", "vendor", "-D", "accent=#f00", "-d"],
        );
        let options = cli.build_compiler_options(&matches).unwrap();

        assert_eq!(options.url_mode, UrlMode::Relative);
        assert_eq!(options.include_directories, vec!["vendor"]);
        assert_eq!(options.custom_variables.get("accent").map(String::as_str), Some("#f00"));
        assert!(options.debug_mode);
    }

    #[test]
    fn test_command_line_overrides_config() {
        let mut cli = EnhancedCli::new();
        cli.config = ConfigFile {
            url_mode: Some("absolute".to_string()),
            include_directories: Some(vec!["shared".to_string()]),
            custom_variables: Some(HashMap::from([
                ("accent".to_string(), "blue".to_string()),
                ("gutter".to_string(), "8px".to_string()),
            ])),
            output_directory: None,
        };

        let options = cli.build_compiler_options(&compile_matches(&cli, &["main.scss"])).unwrap();
        assert_eq!(options.url_mode, UrlMode::Absolute);

        let matches = compile_matches(&cli, &["main.scss", "-u", "mixed", "-I", "local", "-D", "accent=red"]);
        let options = cli.build_compiler_options(&matches).unwrap();
        assert_eq!(options.url_mode, UrlMode::Mixed);
        assert_eq!(options.include_directories, vec!["local", "shared"]);
        assert_eq!(options.custom_variables["accent"], "red");
        assert_eq!(options.custom_variables["gutter"], "8px");
    }

    #[test]
    fn test_invalid_definitions() {
        let cli = EnhancedCli::new();
        let matches = compile_matches(&cli, &["main.scss", "-D", "missing-value"]);
        assert!(matches!(
            cli.build_compiler_options(&matches),
            Err(CompilerError::InvalidFormat { .. })
        ));

        let mut cli = EnhancedCli::new();
        cli.config.url_mode = Some("sideways".to_string());
        let matches = compile_matches(&cli, &["main.scss"]);
        assert!(cli.build_compiler_options(&matches).is_err());
    }
}
