use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::initialize::init_db;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::success;

/// Initialize the configuration and database.
pub fn handle(cli: &Cli) -> AppResult<()> {
    Config::init_all(cli.db.clone(), cli.test)?;

    let cfg = if let Some(db) = &cli.db {
        Config {
            database: db.clone(),
            ..Default::default()
        }
    } else {
        Config::load()?
    };

    let pool = DbPool::new(&cfg.database)?;
    pool.with_conn(|conn| init_db(conn))?;

    success("Database initialized.");
    Ok(())
}
