//! The graph collaborator: a compacted colored de Bruijn graph.
//!
//! Link annotation and navigation only need a small set of queries, which are collected in the [`LinkGraph`] trait.
//! Any graph engine can be used by implementing the trait.
//! [`CompactedGraph`] is a simple in-memory implementation built directly from sequences.
//!
//! ### Nodes
//!
//! Nodes are oriented unitigs.
//! Every unitig appears as two nodes, one for each orientation, and a node is identified by its first k-mer in that orientation (the head).
//! The last k-mer of the node (the tail) is used as the key for the junction tree of the node.
//! There is an edge from node `u` to node `v` if `u.tail.forward_base(c) == v.head` for some nucleotide `c`.
//! The edge is labeled with `c`, which is also the last base of `v.head`.

use crate::error::{LinkError, Result};
use crate::kmer::{Kmer, KmerIter};
use crate::utils;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use bio::io::fasta;
use log::{debug, info};


//-----------------------------------------------------------------------------

/// Nucleotides in the order used for enumerating edges.
pub const NUCLEOTIDES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Attributes of an oriented node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    /// First k-mer of the node. This is also the node identifier.
    pub head: Kmer,
    /// Last k-mer of the node.
    pub tail: Kmer,
    /// Length of the node in k-mers.
    pub length: usize,
    /// Colors associated with the node in increasing order.
    pub colors: Vec<usize>,
}

impl NodeInfo {
    /// Returns `true` if the node has the given color.
    pub fn has_color(&self, color: usize) -> bool {
        self.colors.binary_search(&color).is_ok()
    }
}

/// The oriented node containing a k-mer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KmerHit {
    /// Head of the node in the orientation where the k-mer occurs as given.
    pub node: Kmer,
    /// Offset of the k-mer in the node (in k-mers).
    pub offset: usize,
    /// Length of the node in k-mers.
    pub length: usize,
}

impl KmerHit {
    /// Returns the number of k-mers after this one in the node.
    #[inline]
    pub fn distance_to_tail(&self) -> usize {
        self.length - self.offset - 1
    }
}

//-----------------------------------------------------------------------------

/// Graph queries used for link annotation and navigation.
///
/// Node identifiers are head k-mers in the orientation of the node.
/// See the module documentation for details.
pub trait LinkGraph {
    /// Returns the k-mer length.
    fn k(&self) -> usize;

    /// Returns `true` if `node` is the head of an oriented node.
    fn contains(&self, node: Kmer) -> bool;

    /// Returns the oriented node containing the given k-mer.
    ///
    /// If `extremities_only` is set, the k-mer must be the head or the tail of the node.
    fn find(&self, kmer: Kmer, extremities_only: bool) -> Option<KmerHit>;

    /// Returns the attributes of the node with the given head.
    fn node(&self, head: Kmer) -> Option<NodeInfo>;

    /// Returns the k-mer at the given offset of the node.
    fn kmer_at(&self, head: Kmer, offset: usize) -> Option<Kmer>;

    /// Returns the successors of the node, ordered by edge label.
    fn successors(&self, head: Kmer) -> Vec<Kmer>;

    /// Returns the predecessors of the node, ordered by the first base of the predecessor tail.
    fn predecessors(&self, head: Kmer) -> Vec<Kmer>;

    /// Returns `true` if the node exists and has the given color.
    fn has_color(&self, head: Kmer, color: usize) -> bool {
        self.node(head).map(|info| info.has_color(color)).unwrap_or(false)
    }

    /// Returns the successors with the given color, or all successors if `color` is [`None`].
    fn successors_with_color(&self, head: Kmer, color: Option<usize>) -> Vec<Kmer> {
        let successors = self.successors(head);
        match color {
            Some(color) => successors.into_iter().filter(|succ| self.has_color(*succ, color)).collect(),
            None => successors,
        }
    }

    /// Returns the predecessors with the given color, or all predecessors if `color` is [`None`].
    fn predecessors_with_color(&self, head: Kmer, color: Option<usize>) -> Vec<Kmer> {
        let predecessors = self.predecessors(head);
        match color {
            Some(color) => predecessors.into_iter().filter(|pred| self.has_color(*pred, color)).collect(),
            None => predecessors,
        }
    }
}

//-----------------------------------------------------------------------------

// A unitig in the orientation where it was first built.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Unitig {
    kmers: Vec<Kmer>,
    colors: Vec<usize>,
}

/// An in-memory compacted colored de Bruijn graph.
///
/// The graph is built from sequences, each of which is associated with a color.
/// Canonical k-mers are collected from all sequences, and maximal non-branching paths are compacted into unitigs.
/// The color set of a unitig is the union of the colors of its k-mers.
///
/// The k-mer length must be odd, which guarantees that no k-mer is its own reverse complement.
///
/// # Examples
///
/// ```
/// use linked_dbg::{CompactedGraph, Kmer, LinkGraph};
///
/// // A single sequence without repeats becomes a single unitig.
/// let graph = CompactedGraph::from_sequences(5, &[(b"ACTGATTTCGA".as_slice(), 0)]).unwrap();
/// assert_eq!(graph.unitigs(), 1);
/// assert_eq!(graph.nodes(), 2);
///
/// let head: Kmer = "ACTGA".parse().unwrap();
/// let info = graph.node(head).unwrap();
/// assert_eq!(info.tail.to_string(), "TTCGA");
/// assert_eq!(info.length, 7);
/// assert_eq!(info.colors, vec![0]);
///
/// // The same unitig in the other orientation.
/// let reverse: Kmer = "TCGAA".parse().unwrap();
/// assert!(graph.contains(reverse));
/// assert_eq!(graph.sequence(reverse).unwrap(), b"TCGAAATCAGT".to_vec());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactedGraph {
    k: usize,
    unitigs: Vec<Unitig>,
    // Maps canonical k-mers to (unitig, offset).
    index: HashMap<Kmer, (usize, usize)>,
    colors: usize,
}

impl CompactedGraph {
    /// Builds a graph from `(sequence, color)` pairs.
    ///
    /// Windows containing symbols other than `acgtACGT` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is even or larger than 31.
    pub fn from_sequences(k: usize, sequences: &[(&[u8], usize)]) -> Result<Self> {
        if k % 2 == 0 || k > Kmer::MAX_K {
            return Err(LinkError::InvalidInput(format!("Unsupported k-mer length {} (must be odd and at most 31)", k)));
        }

        let mut kmer_colors: HashMap<Kmer, BTreeSet<usize>> = HashMap::new();
        let mut colors = 0;
        for (sequence, color) in sequences.iter() {
            colors = colors.max(*color + 1);
            for (_, kmer) in KmerIter::new(sequence, k) {
                kmer_colors.entry(kmer.rep()).or_default().insert(*color);
            }
        }

        let mut graph = CompactedGraph {
            k,
            unitigs: Vec::new(),
            index: HashMap::with_capacity(kmer_colors.len()),
            colors,
        };

        // Build the unitigs in a deterministic order.
        let mut kmers: Vec<Kmer> = kmer_colors.keys().cloned().collect();
        kmers.sort_unstable();
        for start in kmers {
            if graph.index.contains_key(&start) {
                continue;
            }
            let unitig = Self::extend_unitig(start, &kmer_colors, &graph.index);
            let mut unitig_colors: BTreeSet<usize> = BTreeSet::new();
            let id = graph.unitigs.len();
            for (offset, kmer) in unitig.iter().enumerate() {
                graph.index.insert(kmer.rep(), (id, offset));
                if let Some(colors) = kmer_colors.get(&kmer.rep()) {
                    unitig_colors.extend(colors.iter().cloned());
                }
            }
            graph.unitigs.push(Unitig { kmers: unitig, colors: unitig_colors.into_iter().collect() });
        }

        debug!("Built a graph with {} k-mers and {} unitigs", graph.index.len(), graph.unitigs.len());
        Ok(graph)
    }

    /// Builds a graph from FASTA files, which may be gzip-compressed.
    ///
    /// All sequences in the `i`-th file get color `i`.
    ///
    /// # Errors
    ///
    /// Passes through errors from reading the files and from [`CompactedGraph::from_sequences`].
    pub fn from_fasta_files<P: AsRef<Path>>(k: usize, files: &[P]) -> Result<Self> {
        let mut sequences: Vec<(Vec<u8>, usize)> = Vec::new();
        for (color, filename) in files.iter().enumerate() {
            info!("Reading reference sequences from {}", filename.as_ref().display());
            let reader = fasta::Reader::new(utils::open_file(filename)?);
            for record in reader.records() {
                let record = record?;
                sequences.push((record.seq().to_vec(), color));
            }
        }
        let borrowed: Vec<(&[u8], usize)> = sequences.iter().map(|(seq, color)| (seq.as_slice(), *color)).collect();
        Self::from_sequences(k, &borrowed)
    }

    fn is_present(kmer: Kmer, kmers: &HashMap<Kmer, BTreeSet<usize>>) -> bool {
        kmers.contains_key(&kmer.rep())
    }

    fn next_kmers(kmer: Kmer, kmers: &HashMap<Kmer, BTreeSet<usize>>) -> Vec<Kmer> {
        NUCLEOTIDES.iter().filter_map(|base| kmer.forward_base(*base)).filter(|next| Self::is_present(*next, kmers)).collect()
    }

    fn prev_kmers(kmer: Kmer, kmers: &HashMap<Kmer, BTreeSet<usize>>) -> Vec<Kmer> {
        NUCLEOTIDES.iter().filter_map(|base| kmer.backward_base(*base)).filter(|prev| Self::is_present(*prev, kmers)).collect()
    }

    // Extends the unitig containing `start` in both directions as long as the path does not branch.
    fn extend_unitig(start: Kmer, kmers: &HashMap<Kmer, BTreeSet<usize>>, assigned: &HashMap<Kmer, (usize, usize)>) -> Vec<Kmer> {
        let mut used: HashSet<Kmer> = HashSet::new();
        used.insert(start.rep());

        let mut forward: Vec<Kmer> = vec![start];
        let mut curr = start;
        loop {
            let next = Self::next_kmers(curr, kmers);
            if next.len() != 1 {
                break;
            }
            let next = next[0];
            if Self::prev_kmers(next, kmers).len() != 1 || used.contains(&next.rep()) || assigned.contains_key(&next.rep()) {
                break;
            }
            used.insert(next.rep());
            forward.push(next);
            curr = next;
        }

        let mut backward: Vec<Kmer> = Vec::new();
        curr = start;
        loop {
            let prev = Self::prev_kmers(curr, kmers);
            if prev.len() != 1 {
                break;
            }
            let prev = prev[0];
            if Self::next_kmers(prev, kmers).len() != 1 || used.contains(&prev.rep()) || assigned.contains_key(&prev.rep()) {
                break;
            }
            used.insert(prev.rep());
            backward.push(prev);
            curr = prev;
        }

        backward.reverse();
        backward.extend(forward);
        backward
    }

    /// Returns the number of unitigs.
    pub fn unitigs(&self) -> usize {
        self.unitigs.len()
    }

    /// Returns the number of oriented nodes (two per unitig).
    pub fn nodes(&self) -> usize {
        2 * self.unitigs.len()
    }

    /// Returns the number of distinct canonical k-mers.
    pub fn kmers(&self) -> usize {
        self.index.len()
    }

    /// Returns the number of colors.
    pub fn colors(&self) -> usize {
        self.colors
    }

    /// Returns an iterator over the heads of all oriented nodes.
    pub fn node_iter(&self) -> impl Iterator<Item = Kmer> + '_ {
        self.unitigs.iter().flat_map(|unitig| {
            let first = unitig.kmers[0];
            let last = unitig.kmers[unitig.kmers.len() - 1];
            [first, last.reverse_complement()]
        })
    }

    /// Returns the sequence of the node with the given head.
    pub fn sequence(&self, head: Kmer) -> Option<Vec<u8>> {
        let info = self.node(head)?;
        let mut result = head.to_bytes();
        for offset in 1..info.length {
            result.push(self.kmer_at(head, offset)?.last_base());
        }
        Some(result)
    }

    // Returns (unitig, offset in the stored orientation, is forward).
    fn locate(&self, kmer: Kmer) -> Option<(&Unitig, usize, bool)> {
        if kmer.k() != self.k {
            return None;
        }
        let (id, offset) = *self.index.get(&kmer.rep())?;
        let unitig = &self.unitigs[id];
        Some((unitig, offset, unitig.kmers[offset] == kmer))
    }
}

impl LinkGraph for CompactedGraph {
    fn k(&self) -> usize {
        self.k
    }

    fn contains(&self, node: Kmer) -> bool {
        self.find(node, true).map(|hit| hit.offset == 0).unwrap_or(false)
    }

    fn find(&self, kmer: Kmer, extremities_only: bool) -> Option<KmerHit> {
        let (unitig, offset, forward) = self.locate(kmer)?;
        let length = unitig.kmers.len();
        let hit = if forward {
            KmerHit { node: unitig.kmers[0], offset, length }
        } else {
            KmerHit { node: unitig.kmers[length - 1].reverse_complement(), offset: length - 1 - offset, length }
        };
        if extremities_only && hit.offset != 0 && hit.offset + 1 != length {
            return None;
        }
        Some(hit)
    }

    fn node(&self, head: Kmer) -> Option<NodeInfo> {
        let (unitig, offset, forward) = self.locate(head)?;
        let length = unitig.kmers.len();
        let tail = if forward {
            if offset != 0 {
                return None;
            }
            unitig.kmers[length - 1]
        } else {
            if offset + 1 != length {
                return None;
            }
            unitig.kmers[0].reverse_complement()
        };
        Some(NodeInfo { head, tail, length, colors: unitig.colors.clone() })
    }

    fn kmer_at(&self, head: Kmer, offset: usize) -> Option<Kmer> {
        let (unitig, start, forward) = self.locate(head)?;
        let length = unitig.kmers.len();
        if offset >= length {
            return None;
        }
        if forward && start == 0 {
            Some(unitig.kmers[offset])
        } else if !forward && start + 1 == length {
            Some(unitig.kmers[length - 1 - offset].reverse_complement())
        } else {
            None
        }
    }

    fn successors(&self, head: Kmer) -> Vec<Kmer> {
        let tail = match self.node(head) {
            Some(info) => info.tail,
            None => return Vec::new(),
        };
        NUCLEOTIDES.iter()
            .filter_map(|base| tail.forward_base(*base))
            .filter_map(|next| self.find(next, true))
            .filter(|hit| hit.offset == 0)
            .map(|hit| hit.node)
            .collect()
    }

    fn predecessors(&self, head: Kmer) -> Vec<Kmer> {
        if !self.contains(head) {
            return Vec::new();
        }
        NUCLEOTIDES.iter()
            .filter_map(|base| head.backward_base(*base))
            .filter_map(|prev| self.find(prev, true))
            .filter(|hit| hit.offset + 1 == hit.length)
            .map(|hit| hit.node)
            .collect()
    }

    fn has_color(&self, head: Kmer, color: usize) -> bool {
        match self.locate(head) {
            Some((unitig, _, _)) => unitig.colors.binary_search(&color).is_ok(),
            None => false,
        }
    }
}

//-----------------------------------------------------------------------------
