//! Adding links from sequence files.
//!
//! Reference sequences are read from FASTA files and sequencing reads from FASTQ files.
//! All files may be gzip-compressed.
//! The records are streamed one at a time, and each record is annotated as soon as it has been read.
//!
//! Paired-end reads are usually processed in two passes.
//! The first pass annotates every read independently, and the resulting database is used for finding paths between the mates in the second pass.
//! See [`crate::paired`] for the details.

use crate::annotation::{AnnotatorConfig, LinkAnnotator, MappingResult};
use crate::error::{LinkError, Result};
use crate::graph::LinkGraph;
use crate::kmer;
use crate::linkdb::LinkDatabase;
use crate::paired::{self, PairedMapping, Strand};
use crate::utils;

use std::io::Write;
use std::path::{Path, PathBuf};

use bio::io::{fasta, fastq};
use log::{debug, info, warn};


//-----------------------------------------------------------------------------

/// Default number of FASTA records between progress messages.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Statistics from adding links from a file or a pair of files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Number of records (or read pairs) read.
    pub records: usize,
    /// Number of records skipped because they were shorter than k.
    pub skipped: usize,
    /// Number of annotated records with at least one mapped k-mer in the forward orientation.
    pub mapped: usize,
}

impl IngestStats {
    fn add(&mut self, other: &IngestStats) {
        self.records += other.records;
        self.skipped += other.skipped;
        self.mapped += other.mapped;
    }
}

/// Parameters for [`add_links_from_fastq`] with paired-end reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairedParams {
    /// Build a first-pass database for finding paths between the mates.
    pub two_pass: bool,
    /// Orientation of read 2 relative to read 1.
    pub strand: Strand,
    /// Load the first-pass database from this file instead of building it.
    pub existing_first_pass: Option<PathBuf>,
    /// Save the first-pass database to this file.
    pub save_first_pass: Option<PathBuf>,
    /// Prune the first-pass database with this coverage threshold.
    pub prune_first_pass: Option<usize>,
}

impl Default for PairedParams {
    fn default() -> Self {
        PairedParams {
            two_pass: true,
            strand: Strand::Reverse,
            existing_first_pass: None,
            save_first_pass: None,
            prune_first_pass: None,
        }
    }
}

//-----------------------------------------------------------------------------

fn fasta_error(filename: &Path, err: std::io::Error) -> LinkError {
    LinkError::InvalidFormat(format!("{}: {}", filename.display(), err))
}

fn fastq_error(filename: &Path, err: fastq::Error) -> LinkError {
    LinkError::InvalidFormat(format!("{}: {}", filename.display(), err))
}

fn fastq_reader(filename: &Path) -> Result<fastq::Reader<std::io::BufReader<Box<dyn std::io::BufRead>>>> {
    Ok(fastq::Reader::new(utils::open_file(filename)?))
}

/// Adds links from the sequences in FASTA files.
///
/// If `both_strands` is set, the reverse complement of each sequence is also annotated.
/// Progress is logged after every `batch_size` sequences.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed, or if the database is for a different k.
pub fn add_links_from_fasta<G: LinkGraph, P: AsRef<Path>>(
    graph: &G, db: &mut LinkDatabase, files: &[P], config: &AnnotatorConfig,
    both_strands: bool, batch_size: usize
) -> Result<IngestStats> {
    let batch_size = batch_size.max(1);
    let mut annotator = LinkAnnotator::new(graph, config.clone());
    let mut total = IngestStats::default();
    for filename in files.iter() {
        let filename = filename.as_ref();
        info!("Adding links from {}", filename.display());
        let mut stats = IngestStats::default();
        let reader = fasta::Reader::new(utils::open_file(filename)?);
        for record in reader.records() {
            let record = record.map_err(|err| fasta_error(filename, err))?;
            stats.records += 1;
            if record.seq().len() < graph.k() {
                stats.skipped += 1;
                continue;
            }
            let result = annotator.add_links_from_sequence(db, record.seq(), false)?;
            if result.is_mapped() {
                stats.mapped += 1;
            }
            if both_strands {
                let rc = kmer::reverse_complement(record.seq());
                annotator.add_links_from_sequence(db, &rc, false)?;
            }
            if stats.records % batch_size == 0 {
                info!("Processed {} sequences from {}", stats.records, filename.display());
            }
        }
        info!("Added links from {} sequences ({} mapped, {} too short)", stats.records, stats.mapped, stats.skipped);
        total.add(&stats);
    }
    Ok(total)
}

//-----------------------------------------------------------------------------

fn write_mapping(out: &mut dyn Write, name: &str, orientation: char, result: &MappingResult) -> Result<()> {
    writeln!(out, "{}\t{}\t{}", name, orientation, result)?;
    Ok(())
}

fn write_paired_mapping(out: &mut dyn Write, name: &str, orientation: char, mapping: &PairedMapping) -> Result<()> {
    writeln!(out, "{}\t{}\t{}\t{}\t{}", name, orientation, mapping.result, mapping.read1, mapping.read2)?;
    Ok(())
}

/// Adds links from single-end reads in a FASTQ file.
///
/// Each read and its reverse complement are annotated independently.
/// Reads shorter than k are skipped.
/// If `out` is given, two lines are written for each annotated read: the read name with the mate suffix removed, `F` or `R`, and the [`MappingResult`] columns.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, if the output cannot be written, or if the database is for a different k.
pub fn add_links_from_fastq_single<G: LinkGraph, P: AsRef<Path>>(
    graph: &G, db: &mut LinkDatabase, file: P, config: &AnnotatorConfig,
    mut out: Option<&mut dyn Write>
) -> Result<IngestStats> {
    let filename = file.as_ref();
    let mut annotator = LinkAnnotator::new(graph, config.clone());
    let mut stats = IngestStats::default();
    for record in fastq_reader(filename)?.records() {
        let record = record.map_err(|err| fastq_error(filename, err))?;
        stats.records += 1;
        if record.seq().len() < graph.k() {
            stats.skipped += 1;
            continue;
        }
        let name = utils::strip_mate_suffix(record.id());
        debug!("Processing read {}", name);
        let forward = annotator.add_links_from_sequence(db, record.seq(), false)?;
        let rc = kmer::reverse_complement(record.seq());
        let reverse = annotator.add_links_from_sequence(db, &rc, false)?;
        if forward.is_mapped() {
            stats.mapped += 1;
        }
        if let Some(out) = out.as_mut() {
            write_mapping(&mut **out, name, 'F', &forward)?;
            write_mapping(&mut **out, name, 'R', &reverse)?;
        }
    }
    info!("Added links from {} reads in {} ({} mapped, {} too short)", stats.records, filename.display(), stats.mapped, stats.skipped);
    Ok(stats)
}

/// Adds links from FASTQ files.
///
/// With one file, the reads are treated as single-end reads as in [`add_links_from_fastq_single`].
/// With two files, the files contain the mates of paired-end reads in the same order.
///
/// In paired-end mode with [`PairedParams::two_pass`], a first-pass database is loaded from [`PairedParams::existing_first_pass`] or built from both files independently.
/// A built database is then pruned and saved if requested.
/// The second pass adds links from each read pair using the first-pass database for finding paths between the mates.
/// If `out` is given, two lines are written for each read pair: the read name, `F` or `R` for the direction, the [`paired::PairedAnnotationResult`], and the mapping result columns for both mates.
///
/// # Errors
///
/// Returns [`LinkError::InvalidInput`] if there are no files or more than two files.
/// Passes through errors from reading and writing files and from annotation.
pub fn add_links_from_fastq<G: LinkGraph, P: AsRef<Path>>(
    graph: &G, db: &mut LinkDatabase, files: &[P], config: &AnnotatorConfig,
    params: &PairedParams, mut out: Option<&mut dyn Write>
) -> Result<IngestStats> {
    match db.color() {
        Some(color) => info!("Adding links for color {}", color),
        None => info!("Adding links for the whole graph"),
    }
    if files.len() == 1 {
        info!("PASS 1 / 1: Adding links from {} (single-end mode)", files[0].as_ref().display());
        return add_links_from_fastq_single(graph, db, &files[0], config, out);
    }
    if files.len() != 2 {
        return Err(LinkError::InvalidInput(format!("Expected one or two FASTQ files, got {}", files.len())));
    }
    let (file1, file2) = (files[0].as_ref(), files[1].as_ref());

    let mut first_pass: Option<LinkDatabase> = None;
    if params.two_pass {
        if let Some(filename) = params.existing_first_pass.as_ref() {
            info!("PASS 1 / 2: Loading the first-pass database from {}", filename.display());
            let loaded = LinkDatabase::load(filename)?;
            if loaded.k() != db.k() {
                return Err(LinkError::InvalidInput(format!("First-pass database has k = {} but the database has k = {}", loaded.k(), db.k())));
            }
            first_pass = Some(loaded);
        } else {
            info!("PASS 1.1 / 2: Building the first-pass database");
            let mut built = LinkDatabase::with_color(db.k(), db.color());
            add_links_from_fastq_single(graph, &mut built, file1, config, None)?;
            add_links_from_fastq_single(graph, &mut built, file2, config, None)?;
            if let Some(threshold) = params.prune_first_pass {
                info!("PASS 1.2 / 2: Pruning the first-pass database with threshold {}", threshold);
                built.prune(threshold);
            }
            if let Some(filename) = params.save_first_pass.as_ref() {
                info!("PASS 1.3 / 2: Saving the first-pass database");
                built.save(filename)?;
            }
            first_pass = Some(built);
        }
        info!("PASS 2 / 2: Adding links from {} and {} (paired-end mode)", file1.display(), file2.display());
    } else {
        info!("PASS 1 / 1: Adding links from {} and {} (single-pass paired-end mode)", file1.display(), file2.display());
    }

    let mut stats = IngestStats::default();
    let mut records1 = fastq_reader(file1)?.records();
    let mut records2 = fastq_reader(file2)?.records();
    loop {
        let (read1, read2) = match (records1.next(), records2.next()) {
            (Some(read1), Some(read2)) => (
                read1.map_err(|err| fastq_error(file1, err))?,
                read2.map_err(|err| fastq_error(file2, err))?,
            ),
            (None, None) => break,
            _ => {
                warn!("The read files have a different number of reads; ignoring the remaining reads");
                break;
            },
        };
        stats.records += 1;
        if read1.seq().len() < graph.k() || read2.seq().len() < graph.k() {
            stats.skipped += 1;
            continue;
        }
        let name = utils::strip_mate_suffix(read1.id());
        debug!("Processing read pair {}", name);
        let (forward, reverse) = paired::add_links_from_paired_read(
            graph, db, config, read1.seq(), read2.seq(), params.strand, first_pass.as_ref()
        )?;
        if forward.read1.is_mapped() {
            stats.mapped += 1;
        }
        if let Some(out) = out.as_mut() {
            write_paired_mapping(&mut **out, name, 'F', &forward)?;
            write_paired_mapping(&mut **out, name, 'R', &reverse)?;
        }
    }
    info!("Added links from {} read pairs ({} mapped, {} too short)", stats.records, stats.mapped, stats.skipped);
    Ok(stats)
}

//-----------------------------------------------------------------------------
