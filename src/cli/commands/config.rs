use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::running;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{kv, success};

/// Show or adjust the active configuration.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Config {
        print_config,
        default_project,
        threshold,
    } = cmd
    else {
        return Ok(());
    };

    if default_project.is_some() || threshold.is_some() {
        let engine = super::open_engine(cfg)?;

        if let Some(name) = default_project {
            let project = super::project_by_name(&engine, name)?;
            engine
                .pool()
                .with_conn(|conn| running::set_default_project(conn, Some(project.id)))?;
            success(format!("Default project set to '{}'", project.name));
        }

        if let Some(minutes) = threshold {
            if *minutes <= 0 {
                return Err(AppError::Config(
                    "threshold must be a positive number of minutes".into(),
                ));
            }
            engine
                .pool()
                .with_conn(|conn| running::set_long_running_threshold(conn, *minutes))?;
            success(format!("Long-running alert threshold set to {minutes} min"));
        }

        return Ok(());
    }

    if *print_config {
        let yaml = serde_yaml::to_string(cfg).map_err(|e| AppError::Config(e.to_string()))?;
        print!("{yaml}");
    } else {
        kv("database", &cfg.database);
        kv(
            "owner",
            cfg.owner_id.as_deref().unwrap_or("(none, local-only)"),
        );
        kv("sync", if cfg.sync_enabled { "enabled" } else { "disabled" });
        kv(
            "project",
            cfg.default_project.as_deref().unwrap_or("(none)"),
        );
    }

    Ok(())
}
