//! rPhotoPunch main entrypoint.

use rphotopunch::run;
use rphotopunch::ui::messages::error;

fn main() {
    if let Err(e) = run() {
        error(format!("Error: {e}"));
        std::process::exit(1);
    }
}
