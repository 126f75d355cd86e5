//! # Linked de Bruijn graphs: link annotations for compacted colored de Bruijn graphs.
//!
//! A de Bruijn graph loses the long-range information present in the sequences it was built from.
//! Whenever a sequence passes through a repeat, the graph alone cannot tell which of the possible exits the sequence took.
//! Links restore that information.
//! A link records the choices a sequence made at consecutive branch points, starting from a node that precedes a merge point.
//! Links starting from the same node are stored in a prefix tree ([`JunctionTree`]) that also counts how many sequences supported each choice.
//!
//! This crate builds links from reference sequences and sequencing reads ([`LinkAnnotator`], [`ingest`], [`paired`]), stores them ([`LinkDatabase`], [`LinkBase`]), and uses them for navigating the graph ([`LinkNavigator`]).
//!
//! ### Graphs
//!
//! The graph is accessed through the [`LinkGraph`] trait.
//! Nodes are oriented unitigs identified by their first k-mer (the head).
//! The junction tree of a node is keyed by its last k-mer (the tail).
//! [`CompactedGraph`] is a simple in-memory implementation of the trait that can be built from sequences.
//!
//! ### Annotation
//!
//! A sequence is threaded through the graph k-mer by k-mer.
//! Each visited node that precedes a merge point starts a link, and each choice at a branch point extends all active links.
//! The extent of the mapping is reported in a [`MappingResult`].
//! Read pairs can be joined into longer links if the path between the mates is unambiguous.
//!
//! ### Navigation
//!
//! [`LinkNavigator`] extends a path from a source node.
//! Links are picked up along the way, and the oldest links decide which way to go at each branch point.
//! The traversal stops when there is no safe way to continue, and the reason is reported as a [`NavigatorState`].
//!
//! # Example
//!
//! ```
//! use linked_dbg::{AnnotatorConfig, CompactedGraph, Kmer, LinkAnnotator, LinkDatabase, LinkNavigator, NavigationParams};
//!
//! let graph = CompactedGraph::from_sequences(5, &[(b"ACTGATTTCGATGCGATGCGATGCCACGGTGG".as_slice(), 0)]).unwrap();
//! let mut db = LinkDatabase::new(5);
//! let mut annotator = LinkAnnotator::new(&graph, AnnotatorConfig::default());
//! annotator.add_links_from_sequence(&mut db, b"TTTCGATGCGATGCGATGCCACG", false).unwrap();
//!
//! let mut navigator = LinkNavigator::new(&graph, &db);
//! let source: Kmer = "ACTGA".parse().unwrap();
//! let path: Vec<String> = navigator.traverse(source, NavigationParams::default(), false).unwrap()
//!     .map(|item| item.unwrap().0.to_string())
//!     .collect();
//! assert_eq!(path, vec!["TCGAT", "CGATG", "ATGCG", "CGATG", "ATGCG", "CGATG", "ATGCC", "CCACG", "GTGGC", "GCATC"]);
//! ```

pub mod annotation;
pub mod db;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod jt;
pub mod kmer;
pub mod linkdb;
pub mod nav;
pub mod paired;
pub mod utils;

pub use annotation::{AnnotatorConfig, LinkAnnotator, MappingResult};
pub use db::{LinkBase, LinkInterface};
pub use error::LinkError;
pub use graph::{CompactedGraph, KmerHit, LinkGraph, NodeInfo};
pub use ingest::{IngestStats, PairedParams};
pub use jt::{JunctionTree, Link};
pub use kmer::{Kmer, KmerIter};
pub use linkdb::LinkDatabase;
pub use nav::{LinkManager, LinkNavigator, NavigationParams, NavigatorState, PickedUpLink, Traversal};
pub use paired::{PairedAnnotationResult, PairedMapping, Strand};

#[cfg(test)]
mod internal;
