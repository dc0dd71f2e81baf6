//! [`Args`] definitions.

use clap::Parser;

/// Authentication and session server of the reading application.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    ///
    /// Missing file is not an error: defaults and `CONF_*` environment
    /// variables are used instead.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.toml")]
    pub config: String,
}

impl Args {
    /// Parses command line arguments of the current process.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

#[cfg(test)]
mod spec {
    use clap::Parser as _;

    use super::Args;

    #[test]
    fn parses_config_path() {
        let args =
            Args::try_parse_from(["server", "-c", "local.toml"]).unwrap();

        assert_eq!(args.config, "local.toml");
    }

    #[test]
    fn rejects_unknown_args() {
        assert!(Args::try_parse_from(["server", "--port", "1"]).is_err());
    }
}
