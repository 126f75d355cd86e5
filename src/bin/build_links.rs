use std::io::Write;
use std::time::Instant;
use std::{env, process};

use linked_dbg::{AnnotatorConfig, CompactedGraph, LinkDatabase, PairedParams, Strand};
use linked_dbg::{ingest, utils};
use linked_dbg::utils::FileWriter;
use getopts::Options;
use log::{info, LevelFilter};

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();
    init_logger(config.verbosity);

    // Build the graph.
    let graph = CompactedGraph::from_fasta_files(config.k, &config.graph_files).map_err(|x| x.to_string())?;
    info!(
        "The graph contains {} unitigs, {} k-mers, and {} colors",
        graph.unitigs(), graph.kmers(), graph.colors()
    );
    let mut db = LinkDatabase::with_color(config.k, config.annotator.color);

    // Links from reference sequences.
    if !config.ref_files.is_empty() {
        ingest::add_links_from_fasta(
            &graph, &mut db, &config.ref_files, &config.annotator,
            config.both_strands, ingest::DEFAULT_BATCH_SIZE
        ).map_err(|x| x.to_string())?;
    }

    // Links from reads.
    if !config.read_files.is_empty() {
        let mut mapping_output: Option<FileWriter> = match config.mapping_results.as_ref() {
            Some(filename) => Some(utils::create_file(filename).map_err(|x| x.to_string())?),
            None => None,
        };
        let out: Option<&mut dyn Write> = match mapping_output.as_mut() {
            Some(writer) => Some(writer as &mut dyn Write),
            None => None,
        };
        ingest::add_links_from_fastq(
            &graph, &mut db, &config.read_files, &config.annotator, &config.paired, out
        ).map_err(|x| x.to_string())?;
        if let Some(writer) = mapping_output {
            writer.finish().map_err(|x| x.to_string())?;
        }
    }

    if let Some(threshold) = config.prune {
        let removed = db.prune(threshold);
        info!("Pruned {} junction tree nodes with coverage below {}", removed, threshold);
    }

    // Statistics.
    info!("The database contains {} links in {} junction trees", db.link_count(), db.len());
    db.save(&config.output).map_err(|x| x.to_string())?;
    info!("Wrote the links to {}", config.output);

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

fn init_logger(verbosity: usize) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

//-----------------------------------------------------------------------------

struct Config {
    pub k: usize,
    pub graph_files: Vec<String>,
    pub ref_files: Vec<String>,
    pub both_strands: bool,
    pub read_files: Vec<String>,
    pub annotator: AnnotatorConfig,
    pub paired: PairedParams,
    pub prune: Option<usize>,
    pub mapping_results: Option<String>,
    pub output: String,
    pub verbosity: usize,
}

impl Config {
    const DEFAULT_K: usize = 31;

    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optflagmulti("v", "verbose", "print more information (may be repeated)");
        let k_desc = format!("k-mer length (odd, default: {})", Self::DEFAULT_K);
        opts.optopt("k", "", &k_desc, "INT");
        opts.optmulti("", "refs", "add links from reference sequences in this FASTA file", "FILE");
        opts.optflag("", "both-strands", "also add links from the reverse complements of the references");
        opts.optflag("", "anchor", "start a link at the first mapped node of each sequence");
        opts.optmulti("r", "reads", "add links from reads in this FASTQ file (one file or two paired files)", "FILE");
        opts.optflag("", "single-pass", "do not build a first-pass database for paired reads");
        opts.optflag("", "forward-forward", "paired reads are on the same strand");
        opts.optopt("", "first-pass", "load the first-pass database from this file", "FILE");
        opts.optopt("", "save-first-pass", "save the first-pass database to this file", "FILE");
        opts.optopt("", "prune-first-pass", "prune the first-pass database with this coverage threshold", "INT");
        opts.optopt("c", "color", "only use nodes with this color", "INT");
        opts.optopt("", "max-link-length", "stop extending links after this many k-mers", "INT");
        opts.optopt("", "prune", "remove links with coverage below this threshold", "INT");
        opts.optopt("", "mapping-results", "write read mapping results to this file", "FILE");
        opts.optopt("o", "output", "output file name (default: links.txt)", "FILE");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] graph.fa [graph2.fa ...]", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        if matches.free.is_empty() {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        }

        let k = Self::parse_usize(&matches, "k").unwrap_or(Self::DEFAULT_K);
        let read_files = matches.opt_strs("reads");
        if read_files.len() > 2 {
            eprintln!("Expected one or two read files, got {}", read_files.len());
            process::exit(1);
        }

        let annotator = AnnotatorConfig {
            color: Self::parse_usize(&matches, "color"),
            anchor_first_kmer: matches.opt_present("anchor"),
            max_link_length: Self::parse_usize(&matches, "max-link-length"),
        };
        let paired = PairedParams {
            two_pass: !matches.opt_present("single-pass"),
            strand: if matches.opt_present("forward-forward") { Strand::Forward } else { Strand::Reverse },
            existing_first_pass: matches.opt_str("first-pass").map(|s| s.into()),
            save_first_pass: matches.opt_str("save-first-pass").map(|s| s.into()),
            prune_first_pass: Self::parse_usize(&matches, "prune-first-pass"),
        };

        Config {
            k,
            graph_files: matches.free.clone(),
            ref_files: matches.opt_strs("refs"),
            both_strands: matches.opt_present("both-strands"),
            read_files,
            annotator,
            paired,
            prune: Self::parse_usize(&matches, "prune"),
            mapping_results: matches.opt_str("mapping-results"),
            output: matches.opt_str("o").unwrap_or(String::from("links.txt")),
            verbosity: matches.opt_count("v"),
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
