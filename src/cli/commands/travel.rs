use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::models::record::{NewRecord, NewTravelEntry};
use crate::ui::messages::success;
use crate::utils::time::{now_ms, parse_local_ms};

/// Record a travel distance entry.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Travel {
        project,
        distance,
        date,
        note,
    } = cmd
    {
        let engine = super::open_engine(cfg)?;
        let p = super::project_by_name(&engine, project)?;

        let start_ms = match date {
            Some(d) => parse_local_ms(d)?,
            None => now_ms(),
        };

        let record = engine.create_record(NewRecord::Travel(NewTravelEntry {
            project_id: p.id,
            start_ms,
            distance_km: *distance,
            note: note.clone(),
        }))?;

        success(format!(
            "Travel entry {} recorded: {:.1} km for '{}'",
            record.local_id(),
            distance,
            p.name
        ));

        engine.flush();
    }

    Ok(())
}
