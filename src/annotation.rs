//! Threading sequences through the graph and recording their branch choices.
//!
//! [`LinkAnnotator`] maps the k-mers of a sequence to oriented nodes and follows the path the sequence takes in the graph.
//! At the start of each visited node that precedes a merge point, it starts a new link in the [`JunctionTree`] of the node.
//! At each branch point, the choice made by the sequence is appended to every active link.
//!
//! Unmapped and partially mapped sequences are not errors.
//! The extent of the mapping is reported in a [`MappingResult`].
//!
//! [`JunctionTree`]: crate::JunctionTree

use crate::error::{LinkError, Result};
use crate::graph::{LinkGraph, NodeInfo};
use crate::jt::{JunctionTree, NodeId};
use crate::kmer::Kmer;
use crate::linkdb::LinkDatabase;

use std::collections::HashMap;
use std::fmt::{self, Display};

use log::trace;


//-----------------------------------------------------------------------------

/// Configuration for [`LinkAnnotator`].
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AnnotatorConfig {
    /// Only use nodes with this color.
    ///
    /// Nodes without the color are treated as if they were not in the graph.
    /// If this is not set, the color of the link database is used.
    pub color: Option<usize>,

    /// Start a link at the first mapped node even if it does not precede a merge point.
    ///
    /// This makes it possible to reconstruct reference sequences from the links alone.
    pub anchor_first_kmer: bool,

    /// Stop extending a link once the path from its start is longer than this many k-mers.
    pub max_link_length: Option<usize>,
}

//-----------------------------------------------------------------------------

/// The result of mapping a sequence to the graph.
///
/// The mapped region consists of k-mers `mapping_start..mapping_end`.
/// Within the region, the match vector indicates which k-mers of the sequence are identical to the graph k-mers they were aligned to.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MappingResult {
    /// One value per k-mer of the sequence.
    pub kmer_match: Vec<bool>,
    /// The node containing the first mapped k-mer.
    pub start_node: Option<Kmer>,
    /// The node containing the last mapped k-mer.
    pub end_node: Option<Kmer>,
    /// Index of the first mapped k-mer.
    pub mapping_start: usize,
    /// Index past the last matching k-mer in the mapped region.
    pub mapping_end: usize,
    /// Number of times each node was visited.
    pub unitig_visits: HashMap<Kmer, usize>,
    /// Branch choices made by the sequence, in path order.
    pub junctions: Vec<u8>,
    /// The visited nodes in path order.
    pub path: Vec<Kmer>,
}

impl MappingResult {
    fn new(num_kmers: usize) -> Self {
        MappingResult {
            kmer_match: vec![false; num_kmers],
            ..Default::default()
        }
    }

    /// Returns `true` if at least one k-mer was mapped.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.start_node.is_some()
    }

    /// Returns the number of k-mers in the sequence.
    #[inline]
    pub fn num_kmers(&self) -> usize {
        self.kmer_match.len()
    }

    /// Returns the number of matching k-mers.
    pub fn matches(&self) -> usize {
        self.kmer_match.iter().filter(|x| **x).count()
    }

    /// Returns the percentage of matching k-mers.
    pub fn match_percentage(&self) -> f64 {
        if self.kmer_match.is_empty() {
            0.0
        } else {
            100.0 * self.matches() as f64 / self.num_kmers() as f64
        }
    }

    /// Returns the number of times the node was visited.
    pub fn visits(&self, node: Kmer) -> usize {
        self.unitig_visits.get(&node).cloned().unwrap_or(0)
    }
}

impl Display for MappingResult {
    /// Formats the result as a tab-separated line without a trailing newline.
    ///
    /// The fields are start node, end node, number of k-mers, mapping start, mapping end, the match vector as `0`/`1`, and the percentage of matching k-mers.
    /// Missing nodes are written as `-`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = |x: Option<Kmer>| x.map(|kmer| kmer.to_string()).unwrap_or(String::from("-"));
        let matches: String = self.kmer_match.iter().map(|x| if *x { '1' } else { '0' }).collect();
        write!(
            f, "{}\t{}\t{}\t{}\t{}\t{}\t{:.2}",
            node(self.start_node), node(self.end_node), self.num_kmers(),
            self.mapping_start, self.mapping_end, matches, self.match_percentage()
        )
    }
}

//-----------------------------------------------------------------------------

// A link being extended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ActiveLink {
    tail: Kmer,
    node: NodeId,
    // Path length in k-mers since the start of the link.
    distance: usize,
}

/// Adds links from sequences to a [`LinkDatabase`].
///
/// The annotator holds the links being extended.
/// They are normally discarded at the start of each call, but they can be kept in order to continue the path of the previous sequence.
/// Links are identified by tree node identifiers, so the database should not be pruned while links are being kept.
///
/// # Examples
///
/// ```
/// use linked_dbg::{AnnotatorConfig, CompactedGraph, LinkAnnotator, LinkDatabase};
///
/// let graph = CompactedGraph::from_sequences(5, &[(b"ACTGATTTCGATGCGATGCGATGCCACGGTGG".as_slice(), 0)]).unwrap();
/// let mut db = LinkDatabase::new(5);
/// let mut annotator = LinkAnnotator::new(&graph, AnnotatorConfig::default());
///
/// let result = annotator.add_links_from_sequence(&mut db, b"TTTCGATGCGATGCGATGCCACG", false).unwrap();
/// assert!(result.is_mapped());
/// assert_eq!(result.matches(), result.num_kmers());
/// assert_eq!(result.junctions, b"TGGCG".to_vec());
///
/// let tree = db.get("TTCGA".parse().unwrap()).unwrap();
/// let links: Vec<String> = tree.get_all_links(None).map(|link| link.to_string()).collect();
/// assert_eq!(links, vec![String::from("TGGCG:1,1,1,1,1")]);
/// ```
#[derive(Clone, Debug)]
pub struct LinkAnnotator<'a, G: LinkGraph> {
    graph: &'a G,
    config: AnnotatorConfig,
    active: Vec<ActiveLink>,
}

impl<'a, G: LinkGraph> LinkAnnotator<'a, G> {
    /// Creates a new annotator for the graph.
    pub fn new(graph: &'a G, config: AnnotatorConfig) -> Self {
        LinkAnnotator { graph, config, active: Vec::new() }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Returns the graph.
    pub fn graph(&self) -> &'a G {
        self.graph
    }

    /// Returns the number of links currently being extended.
    pub fn active_links(&self) -> usize {
        self.active.len()
    }

    /// Discards the links currently being extended.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    // The configured color takes precedence over the color of the database.
    fn color(&self, db: &LinkDatabase) -> Option<usize> {
        self.config.color.or(db.color())
    }

    fn allowed(&self, node: Kmer, color: Option<usize>) -> bool {
        match color {
            Some(color) => self.graph.has_color(node, color),
            None => true,
        }
    }

    fn node_info(&self, node: Kmer) -> Result<NodeInfo> {
        self.graph.node(node).ok_or_else(|| LinkError::NotFound(format!("Node {}", node)))
    }

    /// Returns `true` if a link should start at the node.
    ///
    /// This is the case if a successor of the node has more than one predecessor.
    /// Only nodes with [`AnnotatorConfig::color`] are considered.
    pub fn needs_annotation(&self, node: Kmer) -> bool {
        self.starts_link(node, self.config.color)
    }

    fn starts_link(&self, node: Kmer, color: Option<usize>) -> bool {
        self.graph.successors_with_color(node, color).into_iter().any(|succ| {
            self.graph.predecessors_with_color(succ, color).len() > 1
        })
    }

    fn start_link(&mut self, db: &mut LinkDatabase, info: &NodeInfo) {
        db.get_or_create(info.tail);
        self.active.push(ActiveLink { tail: info.tail, node: JunctionTree::ROOT, distance: 0 });
    }

    fn add_choice(&mut self, db: &mut LinkDatabase, symbol: u8) -> Result<()> {
        for link in self.active.iter_mut() {
            if let Some(limit) = self.config.max_link_length {
                if link.distance > limit {
                    continue;
                }
            }
            let tree = db.get_or_create(link.tail);
            link.node = tree.add_edge(link.node, symbol)?;
        }
        Ok(())
    }

    fn advance(&mut self, length: usize) {
        for link in self.active.iter_mut() {
            link.distance += length;
        }
    }

    fn check_database(&self, db: &LinkDatabase) -> Result<()> {
        if db.k() != self.graph.k() {
            return Err(LinkError::InvalidInput(format!("Link database has k = {} but the graph has k = {}", db.k(), self.graph.k())));
        }
        Ok(())
    }

    /// Maps the sequence to the graph and adds its branch choices to the database.
    ///
    /// Unmapped k-mers before the first mapped k-mer are skipped, and the first unmapped k-mer after it ends the mapping.
    /// Within a node, the sequence is assumed to follow the node to its tail, and mismatches are only reported in the match vector.
    /// The mapping also ends if the sequence diverges from the node at the tail or takes an edge that does not exist.
    ///
    /// If `keep_nodes` is set, the links from the previous call continue.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is for a different k, or if the graph reports a node it cannot describe.
    pub fn add_links_from_sequence(&mut self, db: &mut LinkDatabase, sequence: &[u8], keep_nodes: bool) -> Result<MappingResult> {
        self.check_database(db)?;
        if !keep_nodes {
            self.active.clear();
        }
        let k = self.graph.k();
        if sequence.len() < k {
            return Ok(MappingResult::new(0));
        }
        let color = self.color(db);
        let num_kmers = sequence.len() + 1 - k;
        let mut result = MappingResult::new(num_kmers);
        let kmer_at = |pos: usize| Kmer::from_bytes(&sequence[pos..pos + k]);

        let mut pos = 0;
        while pos < num_kmers {
            let hit = kmer_at(pos).and_then(|kmer| self.graph.find(kmer, false)).filter(|hit| self.allowed(hit.node, color));
            let hit = match hit {
                Some(hit) => hit,
                None => {
                    if result.is_mapped() {
                        break;
                    }
                    pos += 1;
                    continue;
                },
            };

            let node = hit.node;
            let info = self.node_info(node)?;
            if !result.is_mapped() {
                result.start_node = Some(node);
                result.mapping_start = pos;
            }
            result.end_node = Some(node);
            result.path.push(node);
            *result.unitig_visits.entry(node).or_insert(0) += 1;
            if self.starts_link(node, color) || (self.config.anchor_first_kmer && result.path.len() == 1) {
                self.start_link(db, &info);
            }

            // Skip to the tail of the node.
            let remaining = hit.distance_to_tail();
            for offset in 0..=remaining {
                if pos + offset >= num_kmers {
                    break;
                }
                let expected = self.graph.kmer_at(node, hit.offset + offset);
                let matched = expected.is_some() && kmer_at(pos + offset) == expected;
                result.kmer_match[pos + offset] = matched;
                if matched {
                    result.mapping_end = pos + offset + 1;
                }
            }
            pos += remaining;
            if pos >= num_kmers || kmer_at(pos) != Some(info.tail) {
                break;
            }

            let edge_pos = pos + k;
            if edge_pos >= sequence.len() {
                break;
            }
            let successors = self.graph.successors_with_color(node, color);
            if successors.len() > 1 {
                let symbol = sequence[edge_pos].to_ascii_uppercase();
                match info.tail.forward_base(symbol) {
                    Some(next) if successors.contains(&next) => {},
                    _ => break,
                }
                trace!("Choice {} at node {}", symbol as char, node);
                result.junctions.push(symbol);
                self.add_choice(db, symbol)?;
            }
            self.advance(info.length);
            pos += 1;
        }

        Ok(result)
    }

    /// Adds the branch choices along an explicit path of nodes.
    ///
    /// Links start at interior nodes that precede a merge point.
    /// The links already being extended continue along the path, which makes it possible to bridge two sequences.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidPath`] if a node does not exist or consecutive nodes are not connected.
    pub fn add_links_from_path(&mut self, db: &mut LinkDatabase, path: &[Kmer]) -> Result<()> {
        self.check_database(db)?;
        let color = self.color(db);
        for (i, node) in path.iter().enumerate() {
            let info = self.graph.node(*node).ok_or_else(|| LinkError::InvalidPath(format!("Node {} is not in the graph", node)))?;
            if i > 0 && i + 1 < path.len() && self.starts_link(*node, color) {
                self.start_link(db, &info);
            }
            if i + 1 < path.len() {
                let next = path[i + 1];
                let successors = self.graph.successors_with_color(*node, color);
                if !successors.contains(&next) {
                    return Err(LinkError::InvalidPath(format!("No edge from {} to {}", node, next)));
                }
                if successors.len() > 1 {
                    self.add_choice(db, next.last_base())?;
                }
                self.advance(info.length);
            }
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------
