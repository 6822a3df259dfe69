//! tempolog main entrypoint.

use tempolog::run;

fn main() {
    if let Err(e) = run() {
        tempolog::ui::messages::error(e.to_string());
        std::process::exit(1);
    }
}
