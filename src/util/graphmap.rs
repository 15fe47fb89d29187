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

use super::graph::{EdgeStatus, Graph, NodeIndex};
use std::{collections::HashMap, hash::Hash};

/// A [Graph] whose nodes are also reachable through a unique key.
#[derive(Debug)]
pub struct GraphMap<K: Eq + Hash + Clone, V, E> {
    graph: Graph<K, E>,
    map: HashMap<K, Node<V>>,
}

#[derive(Debug)]
pub struct Node<V>(V, NodeIndex);

impl<V> Node<V> {
    pub fn index(&self) -> NodeIndex {
        self.1
    }

    pub fn as_ref(&self) -> &V {
        &self.0
    }
}

impl<K: Eq + Hash + Clone, V, E> GraphMap<K, V, E> {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            map: HashMap::new(),
        }
    }

    /// Adds a node under `key`.
    ///
    /// Returns the existing index without replacing the value when `key` is
    /// already in the map, so a key never owns two nodes.
    pub fn add_node(&mut self, key: K, value: V) -> NodeIndex {
        if let Some(existing) = self.map.get(&key) {
            return existing.index();
        }
        let iden = self.graph.add_node(key.clone());
        self.map.insert(key, Node(value, iden));
        iden
    }

    pub fn add_edge_by_index(&mut self, source: NodeIndex, target: NodeIndex, cost: E) -> EdgeStatus {
        self.graph.add_edge(source, target, cost)
    }

    pub fn get_node_by_key(&self, key: &K) -> Option<&Node<V>> {
        self.map.get(key)
    }

    pub fn get_node_by_index(&self, index: NodeIndex) -> Option<&Node<V>> {
        self.map.get(self.graph.get_node(index)?)
    }

    pub fn get_key_by_index(&self, index: NodeIndex) -> Option<&K> {
        self.graph.get_node(index)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn get_graph(&self) -> &Graph<K, E> {
        &self.graph
    }
}
