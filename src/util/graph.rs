//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! Basic graph data structure
//! - source: http://smallcultfollowing.com/babysteps/blog/2015/04/06/modeling-graphs-in-rust-using-vector-indices/
//!
//! Edges point from a dependent to its dependency. Edge labels order the
//! outgoing edges of a node so traversals follow declaration order.

pub type NodeIndex = usize;

type EdgeIndex = usize;

#[derive(Debug, PartialEq)]
struct NodeData<V> {
    node: V,
    first_outgoing_edge: Option<EdgeIndex>,
}

#[derive(Debug, PartialEq)]
struct EdgeData<E> {
    edge: E,
    source: NodeIndex,
    target: NodeIndex,
    next_outgoing_edge: Option<EdgeIndex>,
}

#[derive(Debug, PartialEq)]
pub struct Graph<V, E> {
    vertices: Vec<NodeData<V>>,
    edges: Vec<EdgeData<E>>,
}

/// Traversal state of a node during a depth-first walk.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Mark {
    /// Not reached yet.
    White,
    /// Entered but not all of its successors are finished.
    Gray,
    /// Every successor is finished.
    Black,
}

impl<V, E> Graph<V, E> {
    /// Creates an empty `Graph` struct.
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            vertices: Vec::new(),
        }
    }

    /// Adds a new node to the graph.
    ///
    /// Returns the `NodeIndex` to remember the node.
    pub fn add_node(&mut self, node: V) -> NodeIndex {
        let index = self.vertices.len();
        self.vertices.push(NodeData {
            node: node,
            first_outgoing_edge: None,
        });
        index
    }

    /// Checks if a given `source` node is in the graph.
    pub fn has_node(&self, source: NodeIndex) -> bool {
        source < self.node_count()
    }

    /// Checks if a given `source` node is connected to the given `target` node.
    pub fn has_edge(&self, source: NodeIndex, target: NodeIndex) -> bool {
        self.has_node(source) && self.successors(source).any(|f| f == target)
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Accesses the node data label behind the `node` index.
    pub fn get_node(&self, node: NodeIndex) -> Option<&V> {
        Some(&self.vertices.get(node)?.node)
    }

    /// Adds a new edge to the graph from `source` to `target`.
    ///
    /// Duplicate edges and self-loops are rejected and leave the graph untouched.
    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, cost: E) -> EdgeStatus {
        if self.has_node(source) == false {
            return EdgeStatus::MissingSource;
        }
        if self.has_node(target) == false {
            return EdgeStatus::MissingTarget;
        }
        // do not allow duplicate edges
        if self.has_edge(source, target) == true {
            return EdgeStatus::AlreadyExists;
        }
        // do not allow self-loops
        if source == target {
            return EdgeStatus::SelfLoop;
        }

        let edge_index = self.edges.len();
        let next_outgoing_edge = self.vertices[source].first_outgoing_edge;
        self.edges.push(EdgeData {
            edge: cost,
            source: source,
            target: target,
            next_outgoing_edge: next_outgoing_edge,
        });
        self.vertices[source].first_outgoing_edge = Some(edge_index);
        EdgeStatus::Success
    }

    /// Returns the number of successors to the `source` node.
    pub fn out_degree(&self, source: NodeIndex) -> usize {
        self.successors(source).count()
    }

    /// Creates an iterator over the outgoing nodes from the `source` node.
    ///
    /// Nodes are produced from the most recently added edge to the oldest.
    pub fn successors(&self, source: NodeIndex) -> Successors<V, E> {
        let first_outgoing_edge = self.vertices[source].first_outgoing_edge;
        Successors {
            graph: self,
            current_edge_index: first_outgoing_edge,
        }
    }
}

impl<V, E: Ord> Graph<V, E> {
    /// Collects the outgoing nodes of `source` sorted by their edge labels.
    pub fn ordered_successors(&self, source: NodeIndex) -> Vec<NodeIndex> {
        let mut labeled: Vec<(&E, NodeIndex)> = Vec::with_capacity(self.out_degree(source));
        let mut current = self.vertices[source].first_outgoing_edge;
        while let Some(i) = current {
            let edge = &self.edges[i];
            labeled.push((&edge.edge, edge.target));
            current = edge.next_outgoing_edge;
        }
        labeled.sort_by(|a, b| a.0.cmp(b.0));
        labeled.into_iter().map(|(_, n)| n).collect()
    }

    /// Walks every node reachable from `root` and lists each one after all of
    /// its successors (post-order).
    ///
    /// Successors are explored by ascending edge label, so the result is the
    /// same on every run. Nodes that close a cycle are skipped.
    pub fn postorder(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.node_count());
        if self.has_node(root) == false {
            return order;
        }
        let mut marks = vec![Mark::White; self.node_count()];
        let mut stack = vec![(root, self.ordered_successors(root).into_iter())];
        marks[root] = Mark::Gray;

        loop {
            let next = match stack.last_mut() {
                Some((_, children)) => children.next(),
                None => break,
            };
            match next {
                Some(n) => {
                    if marks[n] == Mark::White {
                        marks[n] = Mark::Gray;
                        stack.push((n, self.ordered_successors(n).into_iter()));
                    }
                }
                None => {
                    if let Some((n, _)) = stack.pop() {
                        marks[n] = Mark::Black;
                        order.push(n);
                    }
                }
            }
        }
        order
    }

    /// Recursively generates the in-order y-down list of nodes to print with their
    /// corresponding twig style and level of indentation.
    fn recurse_treeview(&self, target: NodeIndex, level: Twig) -> Vec<(Twig, NodeIndex)> {
        let mut traversal = vec![(level.clone(), target)];
        let mut tunnels = self.ordered_successors(target).into_iter().peekable();
        while let Some(n) = tunnels.next() {
            // remember the order and parent branch type
            let twig_type = match tunnels.peek() {
                Some(_) => Twig::MidBranch(Some(Box::new(level.clone()))),
                None => Twig::EndLeaf(Some(Box::new(level.clone()))),
            };
            traversal.append(&mut self.recurse_treeview(n, twig_type));
        }
        traversal
    }

    /// Creates the in-order y-down list of nodes to display with their
    /// corresponding indentation depth and twig style.
    ///
    /// The graph must be acyclic.
    pub fn treeview(&self, target: NodeIndex) -> Vec<(Twig, NodeIndex)> {
        self.recurse_treeview(target, Twig::EndLeaf(None))
    }
}

#[derive(Debug, PartialEq)]
pub enum EdgeStatus {
    MissingSource,
    MissingTarget,
    SelfLoop,
    AlreadyExists,
    Success,
}

impl EdgeStatus {
    pub fn is_ok(&self) -> bool {
        match self {
            Self::Success => true,
            _ => false,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Twig {
    EndLeaf(Option<Box<Twig>>),
    MidBranch(Option<Box<Twig>>),
}

impl Twig {
    /// Accesses what type of node was the parent to the current `self`.
    pub fn get_upper(&self) -> Option<&Twig> {
        match self {
            Self::EndLeaf(e) => e.as_deref(),
            Self::MidBranch(e) => e.as_deref(),
        }
    }
}

impl std::fmt::Display for Twig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // determine the spacing leading up the node in the tree
        let mut levels: Vec<&str> = Vec::new();
        let mut x = self;
        while let Some(n) = x.get_upper() {
            match n {
                Self::EndLeaf(q) => {
                    if q.is_some() {
                        levels.push("   ")
                    }
                }
                Self::MidBranch(q) => {
                    if q.is_some() {
                        levels.push("│  ")
                    }
                }
            }
            x = n;
        }
        // twig chains are collected from the leaf upward
        let space: String = levels.into_iter().rev().collect();

        match self {
            Self::EndLeaf(None) => Ok(()),
            Self::EndLeaf(Some(_)) => write!(f, "{}└─ ", space),
            Self::MidBranch(_) => write!(f, "{}├─ ", space),
        }
    }
}

pub struct Successors<'graph, V, E> {
    graph: &'graph Graph<V, E>,
    current_edge_index: Option<EdgeIndex>,
}

impl<'graph, V, E> Iterator for Successors<'graph, V, E> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        match self.current_edge_index {
            None => None,
            Some(edge_num) => {
                let edge = &self.graph.edges[edge_num];
                self.current_edge_index = edge.next_outgoing_edge;
                Some(edge.target)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Transforms a tree into a string for easier verification.
    fn tree_to_string(t: &Vec<(Twig, usize)>) -> String {
        let mut display = String::new();
        for node in t {
            display.push_str(&format!("{}{}\n", node.0, node.1));
        }
        display
    }

    /// Creates a diamond: the top depends on a left and a right module which
    /// both depend on a shared bottom module.
    ///
    ///       n0
    ///      /  \
    ///    n1    n2
    ///      \  /
    ///       n3
    fn diamond() -> Graph<(), usize> {
        let mut g = Graph::new();
        let n0 = g.add_node(());
        let n1 = g.add_node(());
        let n2 = g.add_node(());
        let n3 = g.add_node(());
        g.add_edge(n0, n1, 0);
        g.add_edge(n0, n2, 1);
        g.add_edge(n1, n3, 0);
        g.add_edge(n2, n3, 0);
        g
    }

    /// Creates an example binary tree with height = 2. Edges point from the
    /// parent down to the children it depends on; labels give the declaration order.
    ///
    ///         n0
    ///        /  \
    ///     n1     n4
    ///    /  \   /  \
    /// n2   n3 n5   n6
    fn binary_tree() -> Graph<(), usize> {
        let mut g = Graph::new();
        let n0 = g.add_node(());
        let n1 = g.add_node(());
        let n2 = g.add_node(());
        let n3 = g.add_node(());
        let n4 = g.add_node(());
        let n5 = g.add_node(());
        let n6 = g.add_node(());
        g.add_edge(n0, n1, 0);
        g.add_edge(n0, n4, 1);
        g.add_edge(n1, n2, 0);
        g.add_edge(n1, n3, 1);
        g.add_edge(n4, n5, 0);
        g.add_edge(n4, n6, 1);
        g
    }

    #[test]
    fn add_node_and_has_node() {
        let mut g: Graph<(), ()> = Graph::new();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.has_node(0), false);
        g.add_node(());
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.has_node(0), true);
        assert_eq!(g.has_node(1), false);
    }

    #[test]
    fn add_edge() {
        let mut g = Graph::new();
        let n0 = g.add_node(());
        let n1 = g.add_node(());
        assert_eq!(g.add_edge(n0, n1, ()).is_ok(), true);
        assert_eq!(g.edge_count(), 1);
        // do not allow duplicate edges
        assert_eq!(g.add_edge(n0, n1, ()), EdgeStatus::AlreadyExists);
        // do not allow self-loops
        assert_eq!(g.add_edge(n0, n0, ()), EdgeStatus::SelfLoop);
        // both ends must exist
        assert_eq!(g.add_edge(n0, 9, ()), EdgeStatus::MissingTarget);
        assert_eq!(g.add_edge(9, n0, ()), EdgeStatus::MissingSource);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn degrees() {
        let g = diamond();
        assert_eq!(g.out_degree(0), 2);
        assert_eq!(g.out_degree(3), 0);
        assert_eq!(g.successors(0).collect::<Vec<usize>>(), vec![2, 1]);
    }

    #[test]
    fn ordered_successors_follow_labels() {
        let mut g = Graph::new();
        let n0 = g.add_node(());
        let n1 = g.add_node(());
        let n2 = g.add_node(());
        let n3 = g.add_node(());
        // insert out of declaration order
        g.add_edge(n0, n3, 2);
        g.add_edge(n0, n1, 0);
        g.add_edge(n0, n2, 1);
        assert_eq!(g.ordered_successors(n0), vec![1, 2, 3]);
    }

    #[test]
    fn postorder_places_dependencies_first() {
        let g = diamond();
        assert_eq!(g.postorder(0), vec![3, 1, 2, 0]);

        let g = binary_tree();
        assert_eq!(g.postorder(0), vec![2, 3, 1, 5, 6, 4, 0]);
        assert_eq!(g.postorder(4), vec![5, 6, 4]);
        // unreachable nodes are left out
        assert_eq!(g.postorder(1), vec![2, 3, 1]);
        assert_eq!(g.postorder(42), Vec::<usize>::new());
    }

    #[test]
    fn postorder_every_edge_is_respected() {
        let g = binary_tree();
        let order = g.postorder(0);
        for source in 0..g.node_count() {
            for target in g.successors(source) {
                let s = order.iter().position(|n| n == &source).unwrap();
                let t = order.iter().position(|n| n == &target).unwrap();
                assert!(t < s, "{} must come before {}", target, source);
            }
        }
    }

    #[test]
    fn treeview() {
        let g = diamond();
        let tree = g.treeview(0);
        assert_eq!(
            tree_to_string(&tree),
            "\
0
├─ 1
│  └─ 3
└─ 2
   └─ 3
"
        );
    }

    #[test]
    fn treeview_binary() {
        let g = binary_tree();
        let tree = g.treeview(0);
        assert_eq!(
            tree_to_string(&tree),
            "\
0
├─ 1
│  ├─ 2
│  └─ 3
└─ 4
   ├─ 5
   └─ 6
"
        );
    }

    #[test]
    fn get_node() {
        let mut g = Graph::<&str, usize>::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        g.add_edge(a, b, 0);
        assert_eq!(g.get_node(a), Some(&"a"));
        assert_eq!(g.get_node(b), Some(&"b"));
        assert_eq!(g.get_node(100), None);
    }
}
