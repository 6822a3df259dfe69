use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::log::load_log;
use crate::errors::AppResult;
use crate::ui::messages::info;

/// Print the internal log table.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Log { print } = cmd
        && *print
    {
        let engine = super::open_engine(cfg)?;
        let rows = engine.pool().with_conn(|conn| load_log(conn))?;

        if rows.is_empty() {
            info("Log is empty.");
        }
        for (date, operation, target, message) in rows {
            println!("{date}  {operation:<16} {target:<24} {message}");
        }
    }

    Ok(())
}
