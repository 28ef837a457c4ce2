use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexMap;

/// A directed multigraph keyed by vertex, storing one edge label per
/// (source, destination) pair. Vertex insertion order is preserved since it
/// backs conversion-dependency ordering, where declaration order matters for
/// diagnostics and for picking a deterministic cycle to report.
#[derive(Debug, Clone)]
pub struct Graph<V, E> {
    edges: IndexMap<V, IndexMap<V, E>>,
}

/// Returned by [`Graph::toposort`] when the graph is not a DAG.
#[derive(Debug, Clone)]
pub struct Cycle<V> {
    pub vertices: HashSet<V>,
}

impl<V: Eq + Hash + Clone, E> Default for Graph<V, E> {
    fn default() -> Self {
        Graph { edges: IndexMap::new() }
    }
}

impl<V: Eq + Hash + Clone, E> Graph<V, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, v: V) {
        self.edges.entry(v).or_default();
    }

    pub fn add_edge(&mut self, from: V, to: V, label: E) {
        self.edges.entry(to.clone()).or_default();
        self.edges.entry(from).or_default().insert(to, label);
    }

    pub fn get(&self, from: &V, to: &V) -> Option<&E> {
        self.edges.get(from).and_then(|m| m.get(to))
    }

    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.edges.keys()
    }

    pub fn edges_from(&self, from: &V) -> impl Iterator<Item = (&V, &E)> {
        self.edges.get(from).into_iter().flat_map(|m| m.iter())
    }

    pub fn from_iterable<I>(vertices: I) -> Self
    where
        I: IntoIterator<Item = (V, V, E)>,
    {
        let mut g = Self::new();
        for (from, to, label) in vertices {
            g.add_edge(from, to, label);
        }
        g
    }

    /// Kahn's algorithm. Returns vertices in dependency order (a vertex
    /// appears only after everything it depends on), or the set of vertices
    /// still left with nonzero in-degree if the graph contains a cycle.
    pub fn toposort(&self) -> Result<Vec<V>, Cycle<V>> {
        let mut in_degree: IndexMap<V, usize> =
            self.edges.keys().map(|v| (v.clone(), 0)).collect();
        for (_, targets) in self.edges.iter() {
            for to in targets.keys() {
                *in_degree.entry(to.clone()).or_insert(0) += 1;
            }
        }

        let mut queue: std::collections::VecDeque<V> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(v, _)| v.clone())
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(v) = queue.pop_front() {
            order.push(v.clone());
            for (to, _) in self.edges_from(&v) {
                let deg = in_degree.get_mut(to).expect("vertex seen in edges");
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(to.clone());
                }
            }
        }

        if order.len() == in_degree.len() {
            Ok(order)
        } else {
            let remaining: HashSet<V> = in_degree
                .into_iter()
                .filter(|(v, _)| !order.contains(v))
                .map(|(v, _)| v)
                .collect();
            Err(Cycle { vertices: remaining })
        }
    }
}
