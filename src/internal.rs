use crate::{CompactedGraph, Kmer, LinkDatabase, LinkGraph};
use crate::{AnnotatorConfig, LinkAnnotator, MappingResult};
use crate::utils;

use simple_sds::serialize;

use std::path::{Path, PathBuf};

//-----------------------------------------------------------------------------

// The small reference graph used in most tests.
//
// Oriented nodes as (head, tail, length) with successors:
//   ACTGA TTCGA 7 -> TCGAA, TCGAT    TCGAA TCAGT 7 -> (none)
//   TCGAT TCGAT 1 -> CGATG           ATCGA ATCGA 1 -> TCGAA, TCGAT
//   CGATG GATGC 2 -> ATGCC, ATGCG    GCATC CATCG 2 -> ATCGA, ATCGC
//   ATGCG GCGAT 3 -> CGATG           ATCGC CGCAT 3 -> GCATC
//   ATGCC GCCAC 3 -> CCACC, CCACG    GTGGC GGCAT 3 -> GCATC
//   CCACG GGTGG 5 -> GTGGC           CCACC CGTGG 5 -> GTGGC

pub(crate) const REFERENCE: &str = "ACTGATTTCGATGCGATGCGATGCCACGGTGG";
pub(crate) const K: usize = 5;

// Reads that pass through the repeats of the reference graph.
pub(crate) const LONG_READ: &str = "TTTCGATGCGATGCGATGCCACG";
pub(crate) const CONFLICTING_READ: &str = "TTTCGATGCCACG";

pub(crate) fn reference_graph() -> CompactedGraph {
    let graph = CompactedGraph::from_sequences(K, &[(REFERENCE.as_bytes(), 0)]);
    assert!(graph.is_ok(), "Failed to build the reference graph: {}", graph.unwrap_err());
    graph.unwrap()
}

pub(crate) fn kmer(sequence: &str) -> Kmer {
    let result = sequence.parse::<Kmer>();
    assert!(result.is_ok(), "Invalid k-mer {}: {}", sequence, result.unwrap_err());
    result.unwrap()
}

pub(crate) fn kmers(sequences: &[&str]) -> Vec<Kmer> {
    sequences.iter().map(|sequence| kmer(sequence)).collect()
}

pub(crate) fn kmer_strings(kmers: &[Kmer]) -> Vec<String> {
    kmers.iter().map(|kmer| kmer.to_string()).collect()
}

//-----------------------------------------------------------------------------

// Link utilities.

pub(crate) fn annotate<G: LinkGraph>(annotator: &mut LinkAnnotator<'_, G>, db: &mut LinkDatabase, sequence: &str) -> MappingResult {
    let result = annotator.add_links_from_sequence(db, sequence.as_bytes(), false);
    assert!(result.is_ok(), "Failed to annotate {}: {}", sequence, result.unwrap_err());
    result.unwrap()
}

// Builds the link database from the long read.
pub(crate) fn long_read_links(graph: &CompactedGraph) -> LinkDatabase {
    let mut db = LinkDatabase::new(K);
    let mut annotator = LinkAnnotator::new(graph, AnnotatorConfig::default());
    annotate(&mut annotator, &mut db, LONG_READ);
    db
}

// Returns the links for the given tail as sorted strings.
pub(crate) fn link_strings(db: &LinkDatabase, tail: &str) -> Vec<String> {
    let tree = db.get(kmer(tail));
    assert!(tree.is_ok(), "Missing tree for {}: {}", tail, tree.unwrap_err());
    let mut result: Vec<String> = tree.unwrap().get_all_links(None).map(|link| String::from_utf8_lossy(&link.choices).to_string()).collect();
    result.sort();
    result
}

//-----------------------------------------------------------------------------

// File utilities.

pub(crate) fn temp_file(name_part: &str) -> PathBuf {
    let filename = serialize::temp_file_name(name_part);
    assert!(!utils::file_exists(&filename), "Temporary file {} already exists", filename.display());
    filename
}

pub(crate) fn write_file(filename: &Path, content: &str) {
    let result = std::fs::write(filename, content);
    assert!(result.is_ok(), "Failed to write {}: {}", filename.display(), result.unwrap_err());
}

pub(crate) fn remove_file(filename: &Path) {
    let _ = std::fs::remove_file(filename);
}

//-----------------------------------------------------------------------------
