use std::time::Instant;
use std::{env, fs, process};

use linked_dbg::LinkBase;
use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Check if the database already exists.
    if LinkBase::exists(&config.db_file) {
        if config.overwrite {
            log::warn!("Overwriting database {}", config.db_file);
            fs::remove_file(&config.db_file).map_err(|x| x.to_string())?;
        } else {
            return Err(format!("Database {} already exists", config.db_file));
        }
    }

    // Create the database.
    LinkBase::create_from_file(&config.links_file, &config.db_file).map_err(|x| x.to_string())?;

    // Statistics.
    let database = LinkBase::open(&config.db_file).map_err(|x| x.to_string())?;
    let color = match database.color() {
        Some(color) => color.to_string(),
        None => String::from("all"),
    };
    log::info!(
        "The database contains {} links in {} junction trees (k = {}, color = {})",
        database.links(), database.trees(), database.k(), color
    );
    if let Some(size) = database.file_size() {
        log::info!("Database size: {}", size);
    }

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub links_file: String,
    pub db_file: String,
    pub overwrite: bool,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("o", "output", "output file name (default: <input>.db)", "FILE");
        opts.optflag("", "overwrite", "overwrite the database file if it exists");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] links.txt", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let links_file = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };
        let db_file = matches.opt_str("o").unwrap_or(format!("{}.db", links_file));
        let overwrite = matches.opt_present("overwrite");

        Config {
            links_file,
            db_file,
            overwrite,
        }
    }
}

//-----------------------------------------------------------------------------
