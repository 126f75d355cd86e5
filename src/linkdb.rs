//! The link database: junction trees indexed by node tails.
//!
//! A [`LinkDatabase`] maps the tail k-mer of an oriented node to the [`JunctionTree`] of the node.
//! It is built by [`crate::LinkAnnotator`] and consumed by [`crate::LinkNavigator`].
//!
//! ### Text format
//!
//! The database is stored as a tab-separated text file, which is gzip-compressed if the file name ends with `.gz`.
//! Header lines start with `#`:
//!
//! ```text
//! #linkdb	v1
//! #k	5
//! #color	.
//! ```
//!
//! The color is either `.` (no color) or an integer.
//! Every other non-empty line contains a tail k-mer followed by one field per link, encoded as `choices:coverage` with comma-separated coverages:
//!
//! ```text
//! TTCGA	TCG:2,1,1	TGGCG:2,1,1,1,1
//! ```
//!
//! Trees without links are not stored.
//! Reading the file reproduces the links exactly, but not necessarily the trees that only exist in memory.

use crate::error::{LinkError, Result};
use crate::jt::JunctionTree;
use crate::kmer::Kmer;
use crate::utils;

use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Write};
use std::path::Path;

use log::{debug, info};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Junction trees for the nodes of a graph, indexed by node tails.
///
/// The database may be associated with a color.
/// A [`crate::LinkAnnotator`] adding links to a database with a color only uses nodes with that color, unless its configuration names another color.
///
/// # Examples
///
/// ```
/// use linked_dbg::{LinkDatabase, Kmer};
///
/// let mut db = LinkDatabase::new(5);
/// let tail: Kmer = "TTCGA".parse().unwrap();
/// db.get_or_create(tail).insert(b"TGGCG").unwrap();
/// assert!(db.contains(tail));
/// assert_eq!(db.len(), 1);
/// assert_eq!(db.link_count(), 1);
///
/// let tree = db.get(tail).unwrap();
/// assert_eq!(tree.get_all_links(None).next().unwrap().to_string(), "TGGCG:1,1,1,1,1");
/// assert!(db.get("ACTGA".parse().unwrap()).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkDatabase {
    k: usize,
    color: Option<usize>,
    trees: HashMap<Kmer, JunctionTree>,
}

/// The `(choices, coverage)` pairs of the links for each tail, in sorted order.
pub type LinkSet = BTreeMap<Kmer, Vec<(Vec<u8>, Vec<usize>)>>;

impl LinkDatabase {
    /// File format version.
    pub const VERSION: &'static str = "v1";

    const KEY_FORMAT: &'static str = "#linkdb";
    const KEY_K: &'static str = "#k";
    const KEY_COLOR: &'static str = "#color";
    const NO_COLOR: &'static str = ".";

    /// Creates an empty database for k-mers of length `k`.
    pub fn new(k: usize) -> Self {
        LinkDatabase { k, color: None, trees: HashMap::new() }
    }

    /// Creates an empty database with the given color.
    pub fn with_color(k: usize, color: Option<usize>) -> Self {
        LinkDatabase { k, color, trees: HashMap::new() }
    }

    /// Returns the k-mer length.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the color associated with the database.
    #[inline]
    pub fn color(&self) -> Option<usize> {
        self.color
    }

    /// Sets the color associated with the database.
    pub fn set_color(&mut self, color: Option<usize>) {
        self.color = color;
    }

    /// Returns the number of trees, including trees without links.
    #[inline]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Returns `true` if the database contains no trees.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Returns the total number of links in the database.
    pub fn link_count(&self) -> usize {
        self.trees.values().map(|tree| tree.link_count()).sum()
    }

    /// Returns `true` if there is a tree for the tail.
    pub fn contains(&self, tail: Kmer) -> bool {
        self.trees.contains_key(&tail)
    }

    /// Returns the tree for the tail.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotFound`] if there is no tree for the tail.
    pub fn get(&self, tail: Kmer) -> Result<&JunctionTree> {
        self.trees.get(&tail).ok_or_else(|| LinkError::NotFound(format!("No junction tree for tail {}", tail)))
    }

    /// Returns a mutable reference to the tree for the tail.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotFound`] if there is no tree for the tail.
    pub fn get_mut(&mut self, tail: Kmer) -> Result<&mut JunctionTree> {
        self.trees.get_mut(&tail).ok_or_else(|| LinkError::NotFound(format!("No junction tree for tail {}", tail)))
    }

    /// Returns the tree for the tail, creating an empty tree if necessary.
    pub fn get_or_create(&mut self, tail: Kmer) -> &mut JunctionTree {
        self.trees.entry(tail).or_default()
    }

    /// Inserts a tree for the tail and returns the old tree, if any.
    pub fn insert(&mut self, tail: Kmer, tree: JunctionTree) -> Option<JunctionTree> {
        self.trees.insert(tail, tree)
    }

    /// Returns an iterator over `(tail, tree)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&Kmer, &JunctionTree)> {
        self.trees.iter()
    }

    /// Returns the tails in sorted order.
    pub fn tails(&self) -> Vec<Kmer> {
        let mut result: Vec<Kmer> = self.trees.keys().cloned().collect();
        result.sort_unstable();
        result
    }

    /// Returns the links in the database, excluding trees without links.
    ///
    /// Two databases with the same link set are considered equivalent.
    pub fn link_set(&self) -> LinkSet {
        let mut result = LinkSet::new();
        for (tail, tree) in self.trees.iter() {
            if !tree.is_empty() {
                result.insert(*tail, tree.link_set());
            }
        }
        result
    }

    /// Prunes every tree with the given coverage threshold.
    ///
    /// See [`JunctionTree::prune`] for details.
    /// Trees left without links remain in the database.
    /// Returns the number of removed tree nodes.
    pub fn prune(&mut self, threshold: usize) -> usize {
        let removed: usize = self.trees.values_mut().map(|tree| tree.prune(threshold)).sum();
        debug!("Pruned {} junction tree nodes with threshold {}", removed, threshold);
        removed
    }

    //-------------------------------------------------------------------------

    /// Writes the database in the text format.
    ///
    /// Lines are sorted by tail, and links within a line are in the order of the tree.
    pub fn write<W: Write>(&self, output: &mut W) -> Result<()> {
        writeln!(output, "{}\t{}", Self::KEY_FORMAT, Self::VERSION)?;
        writeln!(output, "{}\t{}", Self::KEY_K, self.k)?;
        match self.color {
            Some(color) => writeln!(output, "{}\t{}", Self::KEY_COLOR, color)?,
            None => writeln!(output, "{}\t{}", Self::KEY_COLOR, Self::NO_COLOR)?,
        }
        for tail in self.tails() {
            let tree = &self.trees[&tail];
            if tree.is_empty() {
                continue;
            }
            writeln!(output, "{}\t{}", tail, Self::encode_links(tree))?;
        }
        Ok(())
    }

    /// Reads a database in the text format.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidFormat`] with the line number if the input cannot be parsed.
    pub fn read<R: BufRead>(input: R) -> Result<Self> {
        let mut k: Option<usize> = None;
        let mut color: Option<usize> = None;
        let mut trees: HashMap<Kmer, JunctionTree> = HashMap::new();
        let mut has_format = false;

        for (line_num, line) in input.lines().enumerate() {
            let line = line?;
            let line_num = line_num + 1;
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if line.starts_with('#') {
                let value = fields.get(1).cloned().unwrap_or("");
                match fields[0] {
                    Self::KEY_FORMAT => {
                        if value != Self::VERSION {
                            return Err(Self::format_error(line_num, &format!("unsupported version {}", value)));
                        }
                        has_format = true;
                    },
                    Self::KEY_K => {
                        k = Some(value.parse().map_err(|_| Self::format_error(line_num, &format!("invalid k-mer length {}", value)))?);
                    },
                    Self::KEY_COLOR => {
                        color = if value == Self::NO_COLOR {
                            None
                        } else {
                            Some(value.parse().map_err(|_| Self::format_error(line_num, &format!("invalid color {}", value)))?)
                        };
                    },
                    _ => {},
                }
                continue;
            }

            if !has_format {
                return Err(Self::format_error(line_num, "missing format header"));
            }
            let k = k.ok_or_else(|| Self::format_error(line_num, "missing k-mer length"))?;
            let tail: Kmer = fields[0].parse().map_err(|_| Self::format_error(line_num, &format!("invalid tail {}", fields[0])))?;
            if tail.k() != k {
                return Err(Self::format_error(line_num, &format!("tail {} is not a {}-mer", tail, k)));
            }
            if trees.contains_key(&tail) {
                return Err(Self::format_error(line_num, &format!("duplicate tail {}", tail)));
            }
            let tree = Self::decode_links(fields.iter().skip(1).cloned()).map_err(|message| Self::format_error(line_num, &message))?;
            trees.insert(tail, tree);
        }

        let k = k.ok_or_else(|| LinkError::InvalidFormat(String::from("Missing k-mer length")))?;
        Ok(LinkDatabase { k, color, trees })
    }

    fn format_error(line_num: usize, message: &str) -> LinkError {
        LinkError::InvalidFormat(format!("Line {}: {}", line_num, message))
    }

    // Encodes the links in the tree as tab-separated `choices:coverage` fields.
    pub(crate) fn encode_links(tree: &JunctionTree) -> String {
        let fields: Vec<String> = tree.get_all_links(None).map(|link| link.to_string()).collect();
        fields.join("\t")
    }

    // Builds a tree from `choices:coverage` fields.
    pub(crate) fn decode_links<'s, I: Iterator<Item = &'s str>>(fields: I) -> std::result::Result<JunctionTree, String> {
        let mut tree = JunctionTree::new();
        for field in fields {
            let (choices, coverage) = Self::parse_link(field).ok_or_else(|| format!("invalid link {}", field))?;
            tree.insert_with_coverage(&choices, &coverage).map_err(|err| err.to_string())?;
        }
        Ok(tree)
    }

    // Parses `choices:coverage`.
    fn parse_link(field: &str) -> Option<(Vec<u8>, Vec<usize>)> {
        let (choices, coverage) = field.split_once(':')?;
        if choices.is_empty() {
            return None;
        }
        let coverage: Vec<usize> = coverage.split(',').map(|count| count.parse().ok()).collect::<Option<Vec<usize>>>()?;
        Some((choices.as_bytes().to_vec(), coverage))
    }

    /// Saves the database to the file in the text format.
    ///
    /// The file is gzip-compressed if its name ends with `.gz`.
    pub fn save<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        info!("Saving {} junction trees with {} links to {}", self.len(), self.link_count(), filename.as_ref().display());
        let mut output = utils::create_file(&filename)?;
        self.write(&mut output)?;
        output.finish()
    }

    /// Loads a database from the file, which may be gzip-compressed.
    pub fn load<P: AsRef<Path>>(filename: P) -> Result<Self> {
        info!("Loading links from {}", filename.as_ref().display());
        let input = utils::open_file(&filename)?;
        let db = Self::read(input)?;
        debug!("Loaded {} junction trees with {} links", db.len(), db.link_count());
        Ok(db)
    }
}

//-----------------------------------------------------------------------------
