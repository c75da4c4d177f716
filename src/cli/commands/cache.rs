use clap::{Arg, ArgMatches, Command};

pub const ARG_CACHE_CAPACITY: &str = "cache-capacity";
pub const ARG_CACHE_IDLE_SECONDS: &str = "cache-idle-seconds";

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub capacity: u64,
    pub idle_seconds: u64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            capacity: matches
                .get_one::<u64>(ARG_CACHE_CAPACITY)
                .copied()
                .unwrap_or(100),
            idle_seconds: matches
                .get_one::<u64>(ARG_CACHE_IDLE_SECONDS)
                .copied()
                .unwrap_or(900),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CACHE_CAPACITY)
                .long(ARG_CACHE_CAPACITY)
                .help("Maximum number of authenticated users kept in memory")
                .env("NOTEGATE_CACHE_CAPACITY")
                .default_value("100")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_CACHE_IDLE_SECONDS)
                .long(ARG_CACHE_IDLE_SECONDS)
                .help("Seconds without access before a cached user expires")
                .env("NOTEGATE_CACHE_IDLE_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
