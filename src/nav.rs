//! Link-informed navigation.
//!
//! [`LinkNavigator`] extends a path from a source node, one node at a time.
//! Nodes with a single successor are followed directly.
//! At a branch point, the choice is made by the links picked up along the way.
//! The links are managed by a [`LinkManager`], and the traversal ends when there is no safe way to continue.
//! The reason is reported as a [`NavigatorState`].
//!
//! ### Link pick-up and choices
//!
//! Whenever the traversal enters a node with a junction tree, the navigator picks up the links in the tree that extend further than any link already held.
//! Each link has a cursor to the next choice and the distance traveled since it was picked up.
//! At a branch point, the links with the largest distance (the oldest cohort) decide the next node.
//! If they disagree, the traversal stops.
//! After the move, links that disagree with the choice or have been used up are dropped.

use crate::error::{LinkError, Result};
use crate::graph::LinkGraph;
use crate::jt::{JunctionTree, Link, NodeId};
use crate::kmer::Kmer;
use crate::linkdb::LinkDatabase;

use std::collections::{BTreeSet, HashSet};
use std::fmt::{self, Display};

use log::debug;


//-----------------------------------------------------------------------------

/// The state of a [`LinkNavigator`].
///
/// All `Halted*` states are terminal for the current traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavigatorState {
    /// No traversal has started.
    Start,
    /// The traversal is in progress.
    Navigating,
    /// The current node has no successors.
    HaltedNoSuccessors,
    /// The current node is a branch point, and there are no links to follow.
    HaltedAmbiguousNoLinks,
    /// The oldest links disagree on the next node.
    HaltedConflictingLinks,
    /// The only successor is the current node itself, or it has been visited and there are no links.
    HaltedLoopPrevention,
    /// The next node would be beyond the distance limit.
    HaltedDistanceLimit,
    /// A stop node was reached.
    HaltedStopNode,
    /// The traversal stopped for another reason, such as an error.
    HaltedOther,
}

impl NavigatorState {
    /// Returns `true` if the state is terminal.
    pub fn is_halted(&self) -> bool {
        !matches!(self, NavigatorState::Start | NavigatorState::Navigating)
    }
}

impl Display for NavigatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavigatorState::Start => "START",
            NavigatorState::Navigating => "NAVIGATING",
            NavigatorState::HaltedNoSuccessors => "HALTED_NO_SUCCESSORS",
            NavigatorState::HaltedAmbiguousNoLinks => "HALTED_AMBIGUOUS_NO_LINKS",
            NavigatorState::HaltedConflictingLinks => "HALTED_MULTIPLE_CONFLICTING_LINKS",
            NavigatorState::HaltedLoopPrevention => "HALTED_LOOP_PREVENTION",
            NavigatorState::HaltedDistanceLimit => "HALTED_DISTANCE_LIMIT",
            NavigatorState::HaltedStopNode => "HALTED_STOP_NODE_REACHED",
            NavigatorState::HaltedOther => "HALTED_OTHER",
        };
        write!(f, "{}", name)
    }
}

//-----------------------------------------------------------------------------

/// A link held during navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickedUpLink {
    /// Tail of the node the link was picked up at.
    pub tail: Kmer,
    /// The link.
    pub link: Link,
    /// Offset of the next choice in the link.
    pub pos: usize,
    /// Distance in k-mers traveled since the link was picked up.
    pub dist: usize,
}

impl PickedUpLink {
    /// Returns the next choice.
    #[inline]
    pub fn next_choice(&self) -> u8 {
        self.link.choices[self.pos]
    }

    /// Returns the number of choices left, including the next one.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.link.len() - self.pos
    }

    /// Returns the coverage of the next choice.
    #[inline]
    pub fn coverage(&self) -> usize {
        self.link.coverage[self.pos]
    }

    // Sort key for newly picked up links.
    fn sort_key(&self) -> (usize, usize, usize) {
        (self.dist, self.coverage(), self.remaining())
    }
}

/// The decision of the oldest cohort of links at a branch point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CohortChoice {
    /// There are no links.
    NoLinks,
    /// All links in the cohort agree on the choice.
    Unanimous(u8),
    /// The links in the cohort disagree; the distinct choices in sorted order.
    Conflicting(Vec<u8>),
}

/// Links held during navigation.
///
/// Each leaf of each junction tree is picked up at most once, until the manager is cleared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkManager {
    links: Vec<PickedUpLink>,
    picked_up: HashSet<(Kmer, NodeId)>,
}

impl LinkManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all links and forgets which links have been picked up.
    pub fn clear(&mut self) {
        self.links.clear();
        self.picked_up.clear();
    }

    /// Returns the number of links held.
    #[inline]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if no links are held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Returns the links held, in pick-up order.
    pub fn links(&self) -> &[PickedUpLink] {
        &self.links
    }

    /// Returns the largest number of remaining choices in the links held.
    pub fn best_remaining(&self) -> Option<usize> {
        self.links.iter().map(|link| link.remaining()).max()
    }

    /// Picks up links from the junction tree of the node with the given tail.
    ///
    /// Only links longer than the best remaining link are picked up.
    /// New links are appended in descending order by (distance, coverage, remaining length).
    /// Returns the number of links picked up.
    pub fn pick_up(&mut self, tail: Kmer, tree: &JunctionTree) -> usize {
        let min_length = self.best_remaining().map(|best| best + 1);
        let mut new_links: Vec<PickedUpLink> = Vec::new();
        for link in tree.get_all_links(min_length) {
            if self.picked_up.insert((tail, link.leaf)) {
                new_links.push(PickedUpLink { tail, link, pos: 0, dist: 0 });
            }
        }
        new_links.sort_by_key(|link| std::cmp::Reverse(link.sort_key()));
        let count = new_links.len();
        self.links.extend(new_links);
        count
    }

    /// Returns the decision of the oldest cohort: the links with the largest distance.
    pub fn cohort_choice(&self) -> CohortChoice {
        let oldest = match self.links.iter().map(|link| link.dist).max() {
            Some(dist) => dist,
            None => return CohortChoice::NoLinks,
        };
        let choices: BTreeSet<u8> = self.links.iter().filter(|link| link.dist == oldest).map(|link| link.next_choice()).collect();
        if choices.len() == 1 {
            CohortChoice::Unanimous(choices.into_iter().next().unwrap_or(0))
        } else {
            CohortChoice::Conflicting(choices.into_iter().collect())
        }
    }

    /// Advances the links after taking the given choice at a branch point.
    ///
    /// Links that disagree with the choice or have no choices left are dropped.
    pub fn move_and_prune(&mut self, choice: u8) {
        self.links.retain_mut(|link| {
            if link.next_choice() != choice || link.pos + 1 >= link.link.len() {
                return false;
            }
            link.pos += 1;
            true
        });
    }

    /// Adds the length of the node just left to the distances of all links.
    pub fn add_distance(&mut self, length: usize) {
        for link in self.links.iter_mut() {
            link.dist += length;
        }
    }
}

//-----------------------------------------------------------------------------

/// Parameters for a traversal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationParams {
    /// Do not yield nodes at this distance (in k-mers) from the start of the source or beyond.
    pub distance_limit: Option<usize>,
    /// Stop after yielding any of these nodes.
    pub stop_nodes: HashSet<Kmer>,
    /// Only follow nodes with this color.
    pub color: Option<usize>,
}

/// A navigation engine that follows links through a graph.
///
/// The navigator keeps the links and the visited nodes between traversals if requested.
/// The state after the last traversal can be inspected with [`LinkNavigator::state`].
///
/// # Examples
///
/// ```
/// use linked_dbg::{AnnotatorConfig, CompactedGraph, Kmer, LinkAnnotator, LinkDatabase};
/// use linked_dbg::{LinkNavigator, NavigationParams, NavigatorState};
///
/// let graph = CompactedGraph::from_sequences(5, &[(b"ACTGATTTCGATGCGATGCGATGCCACGGTGG".as_slice(), 0)]).unwrap();
/// let mut db = LinkDatabase::new(5);
/// let mut annotator = LinkAnnotator::new(&graph, AnnotatorConfig::default());
/// annotator.add_links_from_sequence(&mut db, b"TTTCGATGCGATGCGATGCCACG", false).unwrap();
///
/// let mut navigator = LinkNavigator::new(&graph, &db);
/// let source: Kmer = "ACTGA".parse().unwrap();
/// let path: Vec<String> = navigator.traverse(source, NavigationParams::default(), false).unwrap()
///     .map(|item| item.unwrap().0.to_string())
///     .collect();
/// assert_eq!(path.len(), 10);
/// assert_eq!(path[7], "CCACG");
/// assert_eq!(navigator.state(), NavigatorState::HaltedAmbiguousNoLinks);
/// ```
#[derive(Clone, Debug)]
pub struct LinkNavigator<'a, G: LinkGraph> {
    graph: &'a G,
    db: &'a LinkDatabase,
    manager: LinkManager,
    visited: HashSet<Kmer>,
    state: NavigatorState,
}

impl<'a, G: LinkGraph> LinkNavigator<'a, G> {
    /// Creates a navigator for the graph using the links in the database.
    pub fn new(graph: &'a G, db: &'a LinkDatabase) -> Self {
        LinkNavigator {
            graph, db,
            manager: LinkManager::new(),
            visited: HashSet::new(),
            state: NavigatorState::Start,
        }
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> NavigatorState {
        self.state
    }

    /// Returns the links currently held.
    pub fn manager(&self) -> &LinkManager {
        &self.manager
    }

    /// Returns `true` if the node has been visited.
    pub fn is_visited(&self, node: Kmer) -> bool {
        self.visited.contains(&node)
    }

    fn reset(&mut self, keep_context: bool) {
        if !keep_context {
            self.manager.clear();
            self.visited.clear();
        }
        self.state = NavigatorState::Start;
    }

    fn pick_up(&mut self, tail: Kmer) {
        if let Ok(tree) = self.db.get(tail) {
            let count = self.manager.pick_up(tail, tree);
            if count > 0 {
                debug!("Picked up {} links at tail {}", count, tail);
            }
        }
    }

    /// Starts a traversal from the source node.
    ///
    /// The returned iterator yields `(node, distance)` pairs, where the distance is from the start of the source node to the start of the yielded node.
    /// The source itself is not yielded.
    /// Unless `keep_context` is set, the links and the visited nodes from earlier traversals are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotFound`] if the source is not a node.
    pub fn traverse(&mut self, source: Kmer, params: NavigationParams, keep_context: bool) -> Result<Traversal<'_, 'a, G>> {
        if !self.graph.contains(source) {
            return Err(LinkError::NotFound(format!("Source node {}", source)));
        }
        self.reset(keep_context);
        self.visited.insert(source);
        Ok(Traversal { navigator: self, params, current: source, distance: 0 })
    }

    /// Starts a traversal after following a known path.
    ///
    /// Links are picked up and pruned along the seed path as if it had been traversed, but the seed nodes are not yielded.
    /// Distances are from the start of the first seed node.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidPath`] if the seed is empty, contains a k-mer that is not a node, or contains consecutive nodes that are not connected.
    pub fn traverse_path(&mut self, seed: &[Kmer], params: NavigationParams, keep_context: bool) -> Result<Traversal<'_, 'a, G>> {
        let mut lengths: Vec<usize> = Vec::with_capacity(seed.len());
        let mut tails: Vec<Kmer> = Vec::with_capacity(seed.len());
        let mut branching: Vec<bool> = Vec::with_capacity(seed.len());
        for (i, node) in seed.iter().enumerate() {
            let info = self.graph.node(*node).ok_or_else(|| LinkError::InvalidPath(format!("Node {} is not in the graph", node)))?;
            lengths.push(info.length);
            tails.push(info.tail);
            let successors = self.graph.successors_with_color(*node, params.color);
            if i + 1 < seed.len() && !successors.contains(&seed[i + 1]) {
                return Err(LinkError::InvalidPath(format!("No edge from {} to {}", node, seed[i + 1])));
            }
            branching.push(successors.len() > 1);
        }
        let last = *seed.last().ok_or_else(|| LinkError::InvalidPath(String::from("Empty seed path")))?;

        self.reset(keep_context);
        self.state = NavigatorState::Navigating;
        let mut distance = 0;
        for i in 0..seed.len() - 1 {
            self.visited.insert(seed[i]);
            self.pick_up(tails[i]);
            if branching[i] {
                self.manager.move_and_prune(seed[i + 1].last_base());
            }
            self.manager.add_distance(lengths[i]);
            distance += lengths[i];
        }
        self.visited.insert(last);
        Ok(Traversal { navigator: self, params, current: last, distance })
    }
}

//-----------------------------------------------------------------------------

/// An iterator over the nodes of a traversal.
///
/// Yields `(node, distance)` pairs.
/// The iterator is finite and ends when the navigator reaches a halted state.
/// If the graph and the links are inconsistent, the iterator yields a [`LinkError::LinkMismatch`] and ends in state [`NavigatorState::HaltedOther`].
#[derive(Debug)]
pub struct Traversal<'n, 'a, G: LinkGraph> {
    navigator: &'n mut LinkNavigator<'a, G>,
    params: NavigationParams,
    current: Kmer,
    distance: usize,
}

impl<'n, 'a, G: LinkGraph> Traversal<'n, 'a, G> {
    /// Returns the current state of the navigator.
    pub fn state(&self) -> NavigatorState {
        self.navigator.state
    }

    fn halt(&mut self, state: NavigatorState) {
        debug!("Navigation stopped at {}: {}", self.current, state);
        self.navigator.state = state;
    }

    fn step(&mut self) -> Result<Option<(Kmer, usize)>> {
        let nav = &mut *self.navigator;
        nav.state = NavigatorState::Navigating;
        let info = match nav.graph.node(self.current) {
            Some(info) => info,
            None => {
                self.halt(NavigatorState::HaltedOther);
                return Err(LinkError::NotFound(format!("Node {}", self.current)));
            },
        };
        nav.pick_up(info.tail);

        let successors = nav.graph.successors_with_color(self.current, self.params.color);
        let next = match successors.len() {
            0 => {
                self.halt(NavigatorState::HaltedNoSuccessors);
                return Ok(None);
            },
            1 => {
                let next = successors[0];
                if next == self.current || (nav.manager.is_empty() && nav.visited.contains(&next)) {
                    self.halt(NavigatorState::HaltedLoopPrevention);
                    return Ok(None);
                }
                next
            },
            _ => {
                let choice = match nav.manager.cohort_choice() {
                    CohortChoice::NoLinks => {
                        self.halt(NavigatorState::HaltedAmbiguousNoLinks);
                        return Ok(None);
                    },
                    CohortChoice::Conflicting(_) => {
                        self.halt(NavigatorState::HaltedConflictingLinks);
                        return Ok(None);
                    },
                    CohortChoice::Unanimous(choice) => choice,
                };
                let next = match successors.iter().find(|succ| succ.last_base() == choice) {
                    Some(next) => *next,
                    None => {
                        let current = self.current;
                        self.halt(NavigatorState::HaltedOther);
                        return Err(LinkError::LinkMismatch(format!(
                            "Links choose {} at node {}, but there is no such successor", choice as char, current
                        )));
                    },
                };
                nav.manager.move_and_prune(choice);
                next
            },
        };
        nav.manager.add_distance(info.length);

        let distance = self.distance + info.length;
        if let Some(limit) = self.params.distance_limit {
            if distance >= limit {
                self.halt(NavigatorState::HaltedDistanceLimit);
                return Ok(None);
            }
        }
        let nav = &mut *self.navigator;
        nav.visited.insert(next);
        self.current = next;
        self.distance = distance;
        if self.params.stop_nodes.contains(&next) {
            self.halt(NavigatorState::HaltedStopNode);
        }
        Ok(Some((next, distance)))
    }
}

impl<'n, 'a, G: LinkGraph> Iterator for Traversal<'n, 'a, G> {
    type Item = Result<(Kmer, usize)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.navigator.state.is_halted() {
            return None;
        }
        self.step().transpose()
    }
}

//-----------------------------------------------------------------------------
