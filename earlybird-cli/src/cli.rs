use std::path::PathBuf;

use clap::Parser;
use earlybird_shared::Reservation;

/// Check in to Southwest flights the moment check-in opens.
#[derive(Debug, Parser)]
#[command(name = "earlybird", version, about)]
pub struct Cli {
    /// Debug logging for every request and check-in step
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory holding `default.toml` and optional `$RUN_MODE.toml` / `local.toml`
    #[arg(long, value_name = "DIR", default_value = "config")]
    pub config_dir: PathBuf,

    /// One or more `FIRST LAST CONFIRMATION` triples
    #[arg(required = true, value_name = "FIRST LAST CONFIRMATION")]
    pub passengers: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Expected FIRST LAST CONFIRMATION triples, got {0} values")]
    IncompleteTriple(usize),
}

impl Cli {
    pub fn reservations(&self) -> Result<Vec<Reservation>, UsageError> {
        if self.passengers.is_empty() || self.passengers.len() % 3 != 0 {
            return Err(UsageError::IncompleteTriple(self.passengers.len()));
        }
        Ok(self
            .passengers
            .chunks(3)
            .map(|triple| {
                Reservation::new(triple[0].clone(), triple[1].clone(), triple[2].clone())
            })
            .collect())
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "earlybird_cli=debug,earlybird_checkin=debug,earlybird_site=debug"
        } else {
            "earlybird_cli=info,earlybird_checkin=info,earlybird_site=info"
        }
    }
}
