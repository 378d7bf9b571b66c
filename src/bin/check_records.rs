//! Offline check of a news/article JSON export; never connects to a database.
//! Run: cargo run --bin check_records -- <path-to-json> [cn|zh]

use std::path::Path;
use std::process;

use newsloader::data::check::check_file;
use newsloader::data::schema::{PrimaryLanguage, RecordSchema};
use newsloader::logging::init_logging;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: check_records <path-to-json> [cn|zh]");
        process::exit(2);
    };
    let language = match args.get(2).map(|raw| raw.parse::<PrimaryLanguage>()) {
        None => PrimaryLanguage::default(),
        Some(Ok(language)) => language,
        Some(Err(err)) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };
    init_logging(0);

    println!("checking {path}");
    match check_file(Path::new(path), &RecordSchema::check(language)) {
        Ok(summary) => {
            println!("{summary}");
            if !summary.passed() {
                process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
