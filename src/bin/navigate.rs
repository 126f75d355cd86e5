use std::collections::HashSet;
use std::time::Instant;
use std::{env, process};

use linked_dbg::{CompactedGraph, Kmer, LinkDatabase, LinkNavigator, NavigationParams};
use getopts::Options;
use log::{info, LevelFilter};

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();
    let level = if config.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Load the inputs.
    let db = LinkDatabase::load(&config.links_file).map_err(|x| x.to_string())?;
    info!("Loaded {} links in {} junction trees", db.link_count(), db.len());
    let graph = CompactedGraph::from_fasta_files(db.k(), &config.graph_files).map_err(|x| x.to_string())?;
    info!("The graph contains {} unitigs and {} k-mers", graph.unitigs(), graph.kmers());

    let source: Kmer = config.source.parse().map_err(|x: linked_dbg::LinkError| x.to_string())?;
    let mut stop_nodes: HashSet<Kmer> = HashSet::new();
    for node in config.stop_nodes.iter() {
        let kmer: Kmer = node.parse().map_err(|x: linked_dbg::LinkError| x.to_string())?;
        stop_nodes.insert(kmer);
    }
    let params = NavigationParams {
        distance_limit: config.distance_limit,
        stop_nodes,
        color: config.color.or(db.color()),
    };

    // Navigate.
    let mut navigator = LinkNavigator::new(&graph, &db);
    let traversal = navigator.traverse(source, params, false).map_err(|x| x.to_string())?;
    for item in traversal {
        let (node, distance) = item.map_err(|x| x.to_string())?;
        println!("{}\t{}", node, distance);
    }
    println!("{}", navigator.state());

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub graph_files: Vec<String>,
    pub links_file: String,
    pub source: String,
    pub distance_limit: Option<usize>,
    pub stop_nodes: Vec<String>,
    pub color: Option<usize>,
    pub verbose: bool,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optflag("v", "verbose", "print the decisions made during the traversal");
        opts.optopt("l", "links", "link file (required)", "FILE");
        opts.optopt("s", "source", "start from the node with this head k-mer (required)", "KMER");
        opts.optopt("d", "distance-limit", "stop before reaching this distance from the source", "INT");
        opts.optmulti("", "stop", "stop after reaching the node with this head k-mer", "KMER");
        opts.optopt("c", "color", "only follow nodes with this color (default: the color of the links)", "INT");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] -l links.txt -s KMER graph.fa [graph2.fa ...]", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        let (links_file, source) = match (matches.opt_str("links"), matches.opt_str("source")) {
            (Some(links), Some(source)) => (links, source),
            _ => {
                eprint!("{}", opts.usage(&header));
                process::exit(1);
            }
        };
        if matches.free.is_empty() {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        }

        Config {
            graph_files: matches.free.clone(),
            links_file,
            source,
            distance_limit: Self::parse_usize(&matches, "distance-limit"),
            stop_nodes: matches.opt_strs("stop"),
            color: Self::parse_usize(&matches, "color"),
            verbose: matches.opt_present("v"),
        }
    }

    fn parse_usize(matches: &getopts::Matches, name: &str) -> Option<usize> {
        let value = matches.opt_str(name)?;
        match value.parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                eprintln!("Invalid value for --{}: {}", name, value);
                process::exit(1);
            }
        }
    }
}

//-----------------------------------------------------------------------------
