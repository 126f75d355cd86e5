use super::*;

use crate::{CompactedGraph, LinkDatabase};
use crate::internal;

//-----------------------------------------------------------------------------

fn add_pair(
    graph: &CompactedGraph, db: &mut LinkDatabase, config: &AnnotatorConfig,
    read1: &str, read2: &str, strand: Strand, first_pass: Option<&LinkDatabase>
) -> (PairedMapping, PairedMapping) {
    let result = add_links_from_paired_read(graph, db, config, read1.as_bytes(), read2.as_bytes(), strand, first_pass);
    assert!(result.is_ok(), "Failed to add links from {} / {}: {}", read1, read2, result.unwrap_err());
    result.unwrap()
}

fn results(pair: &(PairedMapping, PairedMapping)) -> (PairedAnnotationResult, PairedAnnotationResult) {
    (pair.0.result, pair.1.result)
}

fn reverse_complement(sequence: &str) -> String {
    String::from_utf8(kmer::reverse_complement(sequence.as_bytes())).unwrap()
}

// The first 12 bases and bases 16..28 of the reference.
const LEFT_MATE: &str = "ACTGATTTCGAT";
const RIGHT_MATE: &str = "TGCGATGCCACG";

//-----------------------------------------------------------------------------

#[test]
fn result_names() {
    let truth = [
        (PairedAnnotationResult::Unknown, "UNKNOWN", false),
        (PairedAnnotationResult::SameUnitig, "SAME_UNITIG", true),
        (PairedAnnotationResult::PathFound, "PATH_FOUND", true),
        (PairedAnnotationResult::RepetitiveUnitig, "REPETITIVE_UNITIG", false),
        (PairedAnnotationResult::NoPathFound, "NO_PATH_FOUND", false),
        (PairedAnnotationResult::Read1Mismatch, "READ1_MISMATCH", false),
        (PairedAnnotationResult::Read2Mismatch, "READ2_MISMATCH", false),
    ];
    for (result, name, joined) in truth {
        assert_eq!(result.to_string(), name, "Wrong name for {:?}", result);
        assert_eq!(result.is_joined(), joined, "Wrong join status for {:?}", result);
    }
    assert_eq!(Strand::default(), Strand::Reverse, "Wrong default strand");
}

#[test]
fn same_unitig() {
    let graph = internal::reference_graph();
    let config = AnnotatorConfig::default();
    let mut db = LinkDatabase::new(internal::K);
    let pair = add_pair(&graph, &mut db, &config, "ACTGATTTC", "ATTTCGATGCGA", Strand::Forward, None);
    assert_eq!(results(&pair), (PairedAnnotationResult::SameUnitig, PairedAnnotationResult::SameUnitig), "Wrong classification");
    assert_eq!(internal::kmer_strings(&pair.0.read1.path), vec!["ACTGA"], "Wrong path for read 1");
    assert_eq!(internal::kmer_strings(&pair.0.read2.path), vec!["ACTGA", "TCGAT", "CGATG", "ATGCG"], "Wrong path for read 2");

    // Both links started at ACTGA continue through read 2.
    let tree = db.get(internal::kmer("TTCGA")).unwrap();
    assert_eq!(tree.link_set(), vec![(b"TG".to_vec(), vec![2, 2])], "Wrong links for TTCGA");
    assert_eq!(internal::link_strings(&db, "TCGAT"), vec!["G"], "Wrong links for TCGAT");
    assert_eq!(internal::link_strings(&db, "CGCAT"), vec!["AA"], "Wrong links for CGCAT");
    assert_eq!(internal::link_strings(&db, "ATCGA"), vec!["A"], "Wrong links for ATCGA");

    // The same fragment sequenced with read 2 on the opposite strand.
    let mut reverse = LinkDatabase::new(internal::K);
    let read2 = reverse_complement("ATTTCGATGCGA");
    let pair = add_pair(&graph, &mut reverse, &config, "ACTGATTTC", &read2, Strand::Reverse, None);
    assert_eq!(results(&pair), (PairedAnnotationResult::SameUnitig, PairedAnnotationResult::SameUnitig), "Wrong classification with reverse strand");
    assert_eq!(reverse.link_set(), db.link_set(), "Strand normalization changed the links");
}

#[test]
fn without_first_pass() {
    let graph = internal::reference_graph();
    let config = AnnotatorConfig::default();
    let mut db = LinkDatabase::new(internal::K);
    let pair = add_pair(&graph, &mut db, &config, LEFT_MATE, RIGHT_MATE, Strand::Forward, None);
    assert_eq!(results(&pair), (PairedAnnotationResult::Unknown, PairedAnnotationResult::Unknown), "Wrong classification");

    // The mates are annotated independently.
    let mut truth = LinkDatabase::new(internal::K);
    let mut annotator = LinkAnnotator::new(&graph, config.clone());
    for read in [LEFT_MATE.to_string(), RIGHT_MATE.to_string(), reverse_complement(RIGHT_MATE), reverse_complement(LEFT_MATE)] {
        internal::annotate(&mut annotator, &mut truth, &read);
    }
    assert_eq!(db.link_set(), truth.link_set(), "Links differ from independent annotation");
    assert_eq!(internal::link_strings(&db, "TTCGA"), vec!["T"], "Wrong links for TTCGA");
}

#[test]
fn path_found() {
    let graph = internal::reference_graph();
    let config = AnnotatorConfig::default();
    let first_pass = internal::long_read_links(&graph);
    let mut db = LinkDatabase::new(internal::K);
    let pair = add_pair(&graph, &mut db, &config, LEFT_MATE, RIGHT_MATE, Strand::Forward, Some(&first_pass));

    // The first-pass links only cover the forward strand.
    assert_eq!(results(&pair), (PairedAnnotationResult::PathFound, PairedAnnotationResult::NoPathFound), "Wrong classification");
    assert_eq!(internal::kmer_strings(&pair.0.read1.path), vec!["ACTGA", "TCGAT"], "Wrong path for read 1");
    assert_eq!(internal::kmer_strings(&pair.0.read2.path), vec!["ATGCG", "CGATG", "ATGCC", "CCACG"], "Wrong path for read 2");

    // The choice at CGATG on the gap joins the links from the mates.
    assert_eq!(internal::link_strings(&db, "TTCGA"), vec!["TGCG"], "Wrong links for TTCGA");
    assert_eq!(internal::link_strings(&db, "TCGAT"), vec!["GCG"], "Wrong links for TCGAT");
    assert_eq!(internal::link_strings(&db, "GCGAT"), vec!["CG"], "Wrong links for GCGAT");
    assert_eq!(internal::link_strings(&db, "ATCGA"), vec!["A"], "Wrong links for ATCGA");

    // Read 2 on the opposite strand gives the same result.
    let mut reverse = LinkDatabase::new(internal::K);
    let read2 = reverse_complement(RIGHT_MATE);
    let pair = add_pair(&graph, &mut reverse, &config, LEFT_MATE, &read2, Strand::Reverse, Some(&first_pass));
    assert_eq!(results(&pair), (PairedAnnotationResult::PathFound, PairedAnnotationResult::NoPathFound), "Wrong classification with reverse strand");
    assert_eq!(reverse.link_set(), db.link_set(), "Strand normalization changed the links");
}

#[test]
fn no_path_found() {
    let graph = internal::reference_graph();
    let config = AnnotatorConfig::default();

    // Without links, the search stops at the first branch.
    let empty = LinkDatabase::new(internal::K);
    let mut db = LinkDatabase::new(internal::K);
    let pair = add_pair(&graph, &mut db, &config, LEFT_MATE, "CCACGGTGG", Strand::Forward, Some(&empty));
    assert_eq!(results(&pair), (PairedAnnotationResult::NoPathFound, PairedAnnotationResult::NoPathFound), "Wrong classification");
    assert_eq!(internal::link_strings(&db, "TTCGA"), vec!["T"], "Links were extended without a path");
}

#[test]
fn repetitive_unitig() {
    let graph = internal::reference_graph();
    let config = AnnotatorConfig::default();
    let first_pass = internal::long_read_links(&graph);

    let mut db = LinkDatabase::new(internal::K);
    let pair = add_pair(&graph, &mut db, &config, LEFT_MATE, "ATGCGATGCG", Strand::Forward, None);
    assert_eq!(results(&pair), (PairedAnnotationResult::Unknown, PairedAnnotationResult::RepetitiveUnitig), "Wrong classification");
    assert_eq!(pair.1.read1.visits(internal::kmer("ATCGC")), 2, "Wrong number of visits to the last node");

    // Repeats are detected before the path search.
    let mut db = LinkDatabase::new(internal::K);
    let pair = add_pair(&graph, &mut db, &config, "ATGCGATGCG", "ATGCCACGGT", Strand::Forward, Some(&first_pass));
    assert_eq!(results(&pair), (PairedAnnotationResult::RepetitiveUnitig, PairedAnnotationResult::NoPathFound), "Wrong classification with a first pass");
}

#[test]
fn mismatches() {
    let graph = internal::reference_graph();
    let config = AnnotatorConfig::default();
    let mut db = LinkDatabase::new(internal::K);

    let pair = add_pair(&graph, &mut db, &config, "GGGGGGGG", RIGHT_MATE, Strand::Forward, None);
    assert_eq!(results(&pair), (PairedAnnotationResult::Read1Mismatch, PairedAnnotationResult::Read2Mismatch), "Wrong classification for unmapped read 1");
    assert!(!pair.0.read1.is_mapped(), "Unmapped read 1 was mapped");
    assert!(pair.0.read2.is_mapped(), "Read 2 was not mapped");

    let pair = add_pair(&graph, &mut db, &config, LEFT_MATE, "GGGGGGGGG", Strand::Forward, None);
    assert_eq!(results(&pair), (PairedAnnotationResult::Read2Mismatch, PairedAnnotationResult::Read1Mismatch), "Wrong classification for unmapped read 2");

    // Read 2 without valid k-mers.
    let pair = add_pair(&graph, &mut db, &config, LEFT_MATE, "NNNNNNNN", Strand::Forward, None);
    assert_eq!(pair.0.result, PairedAnnotationResult::Read2Mismatch, "Wrong classification for read 2 without k-mers");
}

#[test]
fn color_restriction() {
    let graph = CompactedGraph::from_sequences(5, &[(b"GATTACAGGCT".as_slice(), 0), (b"GATTACTTCGG".as_slice(), 1)]).unwrap();
    let mut db = LinkDatabase::with_color(5, Some(1));
    let config = AnnotatorConfig { color: Some(1), ..AnnotatorConfig::default() };

    // Read 2 starts in a node without the color.
    let pair = add_pair(&graph, &mut db, &config, "GATTACT", "TTACAGGCT", Strand::Forward, None);
    assert_eq!(results(&pair), (PairedAnnotationResult::Read2Mismatch, PairedAnnotationResult::Read1Mismatch), "Wrong classification with color 1");
    assert_eq!(internal::kmer_strings(&pair.0.read1.path), vec!["GATTA", "TTACT"], "Wrong path for read 1 with color 1");

    // Without the restriction, both mates map.
    let mut db = LinkDatabase::new(5);
    let pair = add_pair(&graph, &mut db, &AnnotatorConfig::default(), "GATTACT", "TTACAGGCT", Strand::Forward, None);
    assert_eq!(results(&pair), (PairedAnnotationResult::Unknown, PairedAnnotationResult::Unknown), "Wrong classification without color");

    // The color of the database applies when the configuration has none.
    let mut db = LinkDatabase::with_color(5, Some(1));
    let pair = add_pair(&graph, &mut db, &AnnotatorConfig::default(), "GATTACT", "TTACAGGCT", Strand::Forward, None);
    assert_eq!(results(&pair), (PairedAnnotationResult::Read2Mismatch, PairedAnnotationResult::Read1Mismatch), "Wrong classification with database color 1");
    assert_eq!(internal::kmer_strings(&pair.0.read1.path), vec!["GATTA", "TTACT"], "Wrong path for read 1 with database color 1");
}

//-----------------------------------------------------------------------------
