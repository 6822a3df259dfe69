use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::ui::messages::{success, warning};

/// Run the reconciliation sweep.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Sync = cmd {
        let engine = super::open_engine(cfg)?;

        if !engine.is_remote_wired() {
            let (p, s, t) = engine.unsynced_counts()?;
            warning(format!(
                "No remote replica configured: {} record(s) pending ({} projects, {} sessions, {} travel)",
                p + s + t,
                p,
                s,
                t
            ));
            return Ok(());
        }

        let report = engine.reconcile_unsynced()?;
        success(format!(
            "Sync complete: {} pushed, {} still pending",
            report.pushed, report.skipped
        ));
    }

    Ok(())
}
