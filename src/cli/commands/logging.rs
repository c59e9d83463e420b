use clap::{Arg, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("CARTMATE_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::validator_log_level;
    use clap::{Arg, Command};

    fn level_for(value: &str) -> Result<u8, clap::Error> {
        Command::new("test")
            .arg(
                Arg::new("level")
                    .long("level")
                    .value_parser(validator_log_level()),
            )
            .try_get_matches_from(vec!["test", "--level", value])
            .map(|m| m.get_one::<u8>("level").copied().unwrap_or(0))
    }

    #[test]
    fn test_named_levels() {
        assert_eq!(level_for("error").ok(), Some(0));
        assert_eq!(level_for("WARN").ok(), Some(1));
        assert_eq!(level_for("Info").ok(), Some(2));
        assert_eq!(level_for("debug").ok(), Some(3));
        assert_eq!(level_for("trace").ok(), Some(4));
    }

    #[test]
    fn test_numeric_levels() {
        assert_eq!(level_for("0").ok(), Some(0));
        assert_eq!(level_for("5").ok(), Some(5));
        assert!(level_for("6").is_err());
    }

    #[test]
    fn test_invalid_level() {
        assert!(level_for("loud").is_err());
    }
}
