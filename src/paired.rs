//! Annotating paired-end reads.
//!
//! The links from the two mates of a read pair can be joined into longer links, as long as the path between the mates is unambiguous.
//! Both mates are first brought to the same orientation.
//! The pair is then processed twice, once in each direction, so that both strands of the fragment contribute links.
//!
//! In each direction, read 1 is annotated first.
//! If read 2 starts in the node where read 1 ended, or if a path between them can be found using the links from a first pass, the links from read 1 continue through read 2.
//! Otherwise the mates are annotated independently.
//! The outcome is reported as a [`PairedAnnotationResult`].

use crate::annotation::{AnnotatorConfig, LinkAnnotator, MappingResult};
use crate::error::Result;
use crate::graph::LinkGraph;
use crate::kmer::{self, Kmer, KmerIter};
use crate::linkdb::LinkDatabase;
use crate::nav::{LinkNavigator, NavigationParams};

use std::collections::HashSet;
use std::fmt::{self, Display};

use log::debug;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Maximum distance (in k-mers) searched for a path from the end of read 1 to the start of read 2.
pub const MAX_SEARCH_DISTANCE: usize = 1500;

/// Orientation of read 2 relative to read 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Strand {
    /// Both mates are on the same strand.
    Forward,
    /// Read 2 is on the opposite strand, as in standard Illumina libraries.
    #[default]
    Reverse,
}

/// How the links from the two mates were combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PairedAnnotationResult {
    /// Read 1 ended in a distinct node, but there was no first-pass database for a path search.
    Unknown,
    /// Read 2 starts in the node where read 1 ended.
    SameUnitig,
    /// The first-pass links led from the end of read 1 to the start of read 2.
    PathFound,
    /// Read 1 visited its last node more than once, so the join would be ambiguous.
    RepetitiveUnitig,
    /// The first-pass links did not lead to the start of read 2.
    NoPathFound,
    /// Read 1 did not map to the graph.
    Read1Mismatch,
    /// The first valid k-mer of read 2 is not in the graph.
    Read2Mismatch,
}

impl PairedAnnotationResult {
    /// Returns `true` if the links from read 1 were extended through read 2.
    pub fn is_joined(&self) -> bool {
        matches!(self, PairedAnnotationResult::SameUnitig | PairedAnnotationResult::PathFound)
    }
}

impl Display for PairedAnnotationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PairedAnnotationResult::Unknown => "UNKNOWN",
            PairedAnnotationResult::SameUnitig => "SAME_UNITIG",
            PairedAnnotationResult::PathFound => "PATH_FOUND",
            PairedAnnotationResult::RepetitiveUnitig => "REPETITIVE_UNITIG",
            PairedAnnotationResult::NoPathFound => "NO_PATH_FOUND",
            PairedAnnotationResult::Read1Mismatch => "READ1_MISMATCH",
            PairedAnnotationResult::Read2Mismatch => "READ2_MISMATCH",
        };
        write!(f, "{}", name)
    }
}

/// Mapping results for one direction of a read pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairedMapping {
    /// Mapping of the mate processed first.
    pub read1: MappingResult,
    /// Mapping of the mate processed second.
    pub read2: MappingResult,
    /// How the links were combined.
    pub result: PairedAnnotationResult,
}

//-----------------------------------------------------------------------------

/// Adds links from a read pair to the database.
///
/// The mates are processed in both directions, and the mapping results are returned in that order.
/// With [`Strand::Reverse`], the directions are read 1 followed by the reverse complement of read 2, and read 2 followed by the reverse complement of read 1.
/// With [`Strand::Forward`], they are read 1 followed by read 2, and the reverse complement of read 2 followed by the reverse complement of read 1.
///
/// `first_pass` is a database built from the reads without pairing information.
/// It is used for finding paths between the mates.
///
/// # Errors
///
/// Passes through errors from the annotator and the navigator.
///
/// # Examples
///
/// ```
/// use linked_dbg::{AnnotatorConfig, CompactedGraph, LinkDatabase, PairedAnnotationResult, Strand};
/// use linked_dbg::paired;
///
/// let graph = CompactedGraph::from_sequences(5, &[(b"ACTGATTTCGATGCGATGCGATGCCACGGTGG".as_slice(), 0)]).unwrap();
/// let mut db = LinkDatabase::new(5);
/// let (first, second) = paired::add_links_from_paired_read(
///     &graph, &mut db, &AnnotatorConfig::default(), b"ACTGATTTC", b"ATTTCGATGCGA", Strand::Forward, None
/// ).unwrap();
/// assert_eq!(first.result, PairedAnnotationResult::SameUnitig);
/// assert_eq!(second.result, PairedAnnotationResult::SameUnitig);
/// ```
pub fn add_links_from_paired_read<G: LinkGraph>(
    graph: &G, db: &mut LinkDatabase, config: &AnnotatorConfig,
    read1: &[u8], read2: &[u8], strand: Strand,
    first_pass: Option<&LinkDatabase>
) -> Result<(PairedMapping, PairedMapping)> {
    let read1_rc = kmer::reverse_complement(read1);
    let read2_rc = kmer::reverse_complement(read2);
    match strand {
        Strand::Reverse => {
            let first = add_links_with_extension(graph, db, config, read1, &read2_rc, first_pass)?;
            let second = add_links_with_extension(graph, db, config, read2, &read1_rc, first_pass)?;
            Ok((first, second))
        },
        Strand::Forward => {
            let first = add_links_with_extension(graph, db, config, read1, read2, first_pass)?;
            let second = add_links_with_extension(graph, db, config, &read2_rc, &read1_rc, first_pass)?;
            Ok((first, second))
        },
    }
}

/// Adds links from two mates in the same orientation, extending the links from read 1 through read 2 when it is safe.
///
/// See [`add_links_from_paired_read`] for the meaning of the arguments.
pub fn add_links_with_extension<G: LinkGraph>(
    graph: &G, db: &mut LinkDatabase, config: &AnnotatorConfig,
    read1: &[u8], read2: &[u8],
    first_pass: Option<&LinkDatabase>
) -> Result<PairedMapping> {
    let color = config.color.or(db.color());
    let mut annotator = LinkAnnotator::new(graph, config.clone());
    let mapping1 = annotator.add_links_from_sequence(db, read1, false)?;
    let read1_end = mapping1.end_node;

    let read2_start = read2_start_node(graph, read2, color);
    let result = match (read1_end, read2_start) {
        (Some(end), Some(start)) => {
            debug!("Read 1 ends at {}, read 2 starts at {}", end, start);
            let visits = mapping1.visits(end);
            if visits > 1 {
                PairedAnnotationResult::RepetitiveUnitig
            } else if end == start {
                PairedAnnotationResult::SameUnitig
            } else if let Some(first_pass) = first_pass {
                let path = search_path(graph, first_pass, &mapping1.path, start, color)?;
                if path.last() == Some(&start) {
                    debug!("Found a path of {} nodes from {} to {}", path.len(), end, start);
                    let mut full_path = Vec::with_capacity(path.len() + 1);
                    full_path.push(end);
                    full_path.extend(path);
                    annotator.add_links_from_path(db, &full_path)?;
                    PairedAnnotationResult::PathFound
                } else {
                    PairedAnnotationResult::NoPathFound
                }
            } else {
                PairedAnnotationResult::Unknown
            }
        },
        (None, Some(_)) => PairedAnnotationResult::Read1Mismatch,
        (_, None) => PairedAnnotationResult::Read2Mismatch,
    };

    let mapping2 = annotator.add_links_from_sequence(db, read2, result.is_joined())?;
    debug!("Read pair: {}", result);
    Ok(PairedMapping { read1: mapping1, read2: mapping2, result })
}

// The node containing the first valid k-mer of the read, if it has the right color.
fn read2_start_node<G: LinkGraph>(graph: &G, read: &[u8], color: Option<usize>) -> Option<Kmer> {
    let (_, first) = KmerIter::new(read, graph.k()).next()?;
    let hit = graph.find(first, false)?;
    match color {
        Some(color) if !graph.has_color(hit.node, color) => None,
        _ => Some(hit.node),
    }
}

// Follows the first-pass links after the path of read 1 until the start of read 2 or the search limit.
fn search_path<G: LinkGraph>(graph: &G, first_pass: &LinkDatabase, seed: &[Kmer], target: Kmer, color: Option<usize>) -> Result<Vec<Kmer>> {
    let mut stop_nodes = HashSet::new();
    stop_nodes.insert(target);
    let params = NavigationParams {
        distance_limit: Some(MAX_SEARCH_DISTANCE),
        stop_nodes,
        color,
    };
    let mut navigator = LinkNavigator::new(graph, first_pass);
    let mut path = Vec::new();
    for item in navigator.traverse_path(seed, params, false)? {
        let (node, _) = item?;
        path.push(node);
    }
    Ok(path)
}

//-----------------------------------------------------------------------------
