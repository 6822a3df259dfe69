use crate::cli::parser::{Commands, NoteAction};
use crate::config::Config;
use crate::db::running;
use crate::errors::AppResult;
use crate::ui::messages::{info, success};

/// Predefined note management.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Note { action } = cmd else {
        return Ok(());
    };

    let engine = super::open_engine(cfg)?;

    match action {
        NoteAction::Add { text } => {
            let id = engine
                .pool()
                .with_conn(|conn| running::insert_predefined_note(conn, text))?;
            success(format!("Note {id} saved"));
        }
        NoteAction::List => {
            let notes = engine
                .pool()
                .with_conn(|conn| running::list_predefined_notes(conn))?;
            if notes.is_empty() {
                info("No predefined notes.");
            }
            for (id, text) in notes {
                println!("{id:>4}  {text}");
            }
        }
    }

    Ok(())
}
