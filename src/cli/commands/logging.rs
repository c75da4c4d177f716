use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
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
            .env("NOTEGATE_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(level: &str) -> Option<u8> {
        Command::new("test")
            .arg(
                Arg::new("level")
                    .long("level")
                    .value_parser(validator_log_level()),
            )
            .try_get_matches_from(["test", "--level", level])
            .ok()
            .and_then(|matches| matches.get_one::<u8>("level").copied())
    }

    #[test]
    fn accepts_names_and_numbers() {
        assert_eq!(parse("error"), Some(0));
        assert_eq!(parse("WARN"), Some(1));
        assert_eq!(parse("info"), Some(2));
        assert_eq!(parse("Debug"), Some(3));
        assert_eq!(parse("trace"), Some(4));
        assert_eq!(parse("5"), Some(5));
    }

    #[test]
    fn rejects_unknown_levels() {
        assert_eq!(parse("loud"), None);
        assert_eq!(parse("6"), None);
    }

    #[test]
    fn counts_repeated_flags() {
        let matches = with_args(Command::new("test")).get_matches_from(["test", "-vvv"]);
        assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(3));
    }
}
