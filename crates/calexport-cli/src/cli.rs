//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// calexport - Export your Google Calendar events to an iCalendar file
#[derive(Debug, Parser)]
#[command(name = "calexport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path of the .ics file to write
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn output_is_positional() {
        let cli = Cli::try_parse_from(["calexport", "out/calendar.ics"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("out/calendar.ics"));
    }

    #[test]
    fn output_is_required() {
        let err = Cli::try_parse_from(["calexport"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn no_flags_accepted() {
        assert!(Cli::try_parse_from(["calexport", "--verbose", "out.ics"]).is_err());
        assert!(Cli::try_parse_from(["calexport", "a.ics", "b.ics"]).is_err());
    }
}
