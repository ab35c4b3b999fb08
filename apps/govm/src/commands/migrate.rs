//! Migrate command for the govm CLI.
//!
//! Converts a hand-made installation at `<root>/go` into a versioned
//! directory plus the active pointer. `govm install` runs the same step
//! automatically.

use anyhow::Result;

use super::Session;
use crate::toolchain::migrator::{MigrationOutcome, Migrator};

/// Executes the migrate command.
///
/// # Errors
///
/// Returns an error if the legacy version cannot be determined or the
/// migration fails.
pub fn execute(session: &Session) -> Result<()> {
    let prompter = session.prompter(false);
    match Migrator::new(&session.layout, &session.store, &*prompter).migrate()? {
        MigrationOutcome::Migrated { version, dir } => {
            println!("Migrated Go {version} to {}.", dir.display());
            println!(
                "{} now points to it.",
                session.layout.active_link().display()
            );
        }
        MigrationOutcome::Declined => println!("Migration cancelled; nothing was changed."),
        MigrationOutcome::NotApplicable => {
            println!(
                "Nothing to migrate: {} is not a standalone installation.",
                session.layout.active_link().display()
            );
        }
    }
    Ok(())
}
