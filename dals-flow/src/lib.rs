// SPDX-License-Identifier: Apache-2.0

//! Maximum-flow / minimum-cut over an opaque `usize` vertex space.
//!
//! Capacities are `f64`; `f64::INFINITY` marks an edge that can never be
//! saturated. The solver is Dinic's algorithm: a BFS builds the level graph
//! and an iterative DFS with per-vertex cursors pushes a blocking flow.
//!
//! Minimum cuts are extracted from the residual graph after the maximum flow
//! has been found: the source side is every vertex still reachable from the
//! source through arcs with positive residual capacity, and the cut is every
//! original edge leaving that side. Zero-capacity edges never carry residual
//! capacity, so they show up in the cut whenever their tail is reachable.

use std::collections::VecDeque;

/// Residual capacities at or below this value are treated as saturated.
pub const EPSILON: f64 = 1e-12;

const UNREACHED: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub capacity: f64,
    flow: f64,
}

impl Edge {
    pub fn flow(&self) -> f64 {
        self.flow
    }

    pub fn is_unbounded(&self) -> bool {
        self.capacity.is_infinite()
    }

    fn forward_residual(&self) -> f64 {
        if self.is_unbounded() {
            f64::INFINITY
        } else {
            self.capacity - self.flow
        }
    }
}

/// Result of a maximum-flow computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowValue {
    Finite(f64),
    /// There is a source-to-sink path made only of unbounded edges.
    Unbounded,
}

impl FlowValue {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, FlowValue::Unbounded)
    }

    pub fn as_finite(&self) -> Option<f64> {
        match self {
            FlowValue::Finite(v) => Some(*v),
            FlowValue::Unbounded => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinCut {
    /// Sum of the capacities of `edges`; equals the maximum flow.
    pub value: f64,
    /// `source_side[v]` is true iff `v` is reachable from the source in the
    /// final residual graph.
    pub source_side: Vec<bool>,
    /// Original edges crossing from the source side to the sink side, in
    /// insertion order.
    pub edges: Vec<EdgeId>,
}

/// A residual arc: either the forward direction of an edge or its reverse.
#[derive(Debug, Clone, Copy)]
struct Arc {
    edge: usize,
    forward: bool,
}

#[derive(Debug, Clone)]
pub struct FlowNetwork {
    edges: Vec<Edge>,
    /// Outgoing residual arcs per vertex.
    adjacency: Vec<Vec<Arc>>,
}

impl FlowNetwork {
    pub fn new(vertex_count: usize) -> Self {
        FlowNetwork {
            edges: Vec::new(),
            adjacency: vec![Vec::new(); vertex_count],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    /// Adds a directed edge `from -> to`.
    ///
    /// Panics if either endpoint is out of range or the capacity is negative
    /// or NaN.
    pub fn add_edge(&mut self, from: usize, to: usize, capacity: f64) -> EdgeId {
        assert!(
            from < self.vertex_count() && to < self.vertex_count(),
            "edge {} -> {} out of range for {} vertices",
            from,
            to,
            self.vertex_count()
        );
        assert!(
            capacity >= 0.0,
            "edge {} -> {} has invalid capacity {}",
            from,
            to,
            capacity
        );
        let id = self.edges.len();
        self.edges.push(Edge {
            from,
            to,
            capacity,
            flow: 0.0,
        });
        self.adjacency[from].push(Arc {
            edge: id,
            forward: true,
        });
        self.adjacency[to].push(Arc {
            edge: id,
            forward: false,
        });
        EdgeId(id)
    }

    /// Clears all flow so the network can be solved again.
    pub fn reset(&mut self) {
        for e in self.edges.iter_mut() {
            e.flow = 0.0;
        }
    }

    fn head(&self, arc: Arc) -> usize {
        let e = &self.edges[arc.edge];
        if arc.forward { e.to } else { e.from }
    }

    fn tail(&self, arc: Arc) -> usize {
        let e = &self.edges[arc.edge];
        if arc.forward { e.from } else { e.to }
    }

    fn residual(&self, arc: Arc) -> f64 {
        let e = &self.edges[arc.edge];
        if arc.forward {
            e.forward_residual()
        } else {
            e.flow
        }
    }

    fn push(&mut self, arc: Arc, amount: f64) {
        let e = &mut self.edges[arc.edge];
        if arc.forward {
            e.flow += amount;
        } else {
            e.flow -= amount;
        }
    }

    /// Returns true if `sink` is reachable from `source` using unbounded
    /// edges only; in that case no finite flow is maximal.
    fn has_unbounded_path(&self, source: usize, sink: usize) -> bool {
        let mut seen = vec![false; self.vertex_count()];
        let mut worklist = vec![source];
        seen[source] = true;
        while let Some(v) = worklist.pop() {
            if v == sink {
                return true;
            }
            for arc in &self.adjacency[v] {
                if !arc.forward || !self.edges[arc.edge].is_unbounded() {
                    continue;
                }
                let w = self.head(*arc);
                if !seen[w] {
                    seen[w] = true;
                    worklist.push(w);
                }
            }
        }
        false
    }

    /// BFS over arcs with residual capacity; `None` once the sink is cut off.
    fn build_levels(&self, source: usize, sink: usize) -> Option<Vec<usize>> {
        let mut level = vec![UNREACHED; self.vertex_count()];
        level[source] = 0;
        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            for arc in &self.adjacency[v] {
                let w = self.head(*arc);
                if level[w] == UNREACHED && self.residual(*arc) > EPSILON {
                    level[w] = level[v] + 1;
                    queue.push_back(w);
                }
            }
        }
        if level[sink] == UNREACHED {
            None
        } else {
            Some(level)
        }
    }

    /// Pushes a blocking flow along the level graph and returns its value.
    fn blocking_flow(&mut self, source: usize, sink: usize, level: &[usize]) -> f64 {
        let mut cursor = vec![0usize; self.vertex_count()];
        let mut path: Vec<Arc> = Vec::new();
        let mut total = 0.0;
        let mut v = source;
        loop {
            if v == sink {
                let bottleneck = path
                    .iter()
                    .map(|arc| self.residual(*arc))
                    .fold(f64::INFINITY, f64::min);
                debug_assert!(bottleneck.is_finite(), "augmenting path has no finite arc");
                for arc in &path {
                    self.push(*arc, bottleneck);
                }
                total += bottleneck;
                log::trace!(
                    "augmented {} along {} arcs (total {})",
                    bottleneck,
                    path.len(),
                    total
                );
                // Retreat to the tail of the first saturated arc.
                let keep = path
                    .iter()
                    .position(|arc| self.residual(*arc) <= EPSILON)
                    .unwrap_or(0);
                path.truncate(keep);
                v = match path.last() {
                    Some(arc) => self.head(*arc),
                    None => source,
                };
                continue;
            }

            let mut advanced = false;
            while cursor[v] < self.adjacency[v].len() {
                let arc = self.adjacency[v][cursor[v]];
                let w = self.head(arc);
                if level[w] == level[v] + 1 && self.residual(arc) > EPSILON {
                    path.push(arc);
                    v = w;
                    advanced = true;
                    break;
                }
                cursor[v] += 1;
            }
            if advanced {
                continue;
            }

            // Dead end: drop the arc that led here and skip it at its tail.
            match path.pop() {
                Some(arc) => {
                    let u = self.tail(arc);
                    cursor[u] += 1;
                    v = u;
                }
                None => break,
            }
        }
        total
    }

    /// Computes the maximum flow from `source` to `sink`, discarding any flow
    /// left from a previous call.
    pub fn max_flow(&mut self, source: usize, sink: usize) -> FlowValue {
        assert!(source < self.vertex_count() && sink < self.vertex_count());
        assert_ne!(source, sink, "source and sink must differ");
        self.reset();
        if self.has_unbounded_path(source, sink) {
            log::debug!("max_flow: unbounded path from {} to {}", source, sink);
            return FlowValue::Unbounded;
        }
        let mut total = 0.0;
        let mut phases = 0usize;
        while let Some(level) = self.build_levels(source, sink) {
            let pushed = self.blocking_flow(source, sink, &level);
            phases += 1;
            if pushed <= EPSILON {
                break;
            }
            total += pushed;
        }
        log::debug!(
            "max_flow: {} vertices, {} edges, {} phases, value {}",
            self.vertex_count(),
            self.edges.len(),
            phases,
            total
        );
        FlowValue::Finite(total)
    }

    /// Vertices reachable from `source` in the current residual graph.
    fn residual_reachable(&self, source: usize) -> Vec<bool> {
        let mut seen = vec![false; self.vertex_count()];
        seen[source] = true;
        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            for arc in &self.adjacency[v] {
                let w = self.head(*arc);
                if !seen[w] && self.residual(*arc) > EPSILON {
                    seen[w] = true;
                    queue.push_back(w);
                }
            }
        }
        seen
    }

    /// Solves the maximum flow and returns the minimum cut that is closest to
    /// the source. Returns `None` when the flow is unbounded.
    pub fn min_cut(&mut self, source: usize, sink: usize) -> Option<MinCut> {
        let flow = self.max_flow(source, sink).as_finite()?;
        let source_side = self.residual_reachable(source);
        debug_assert!(!source_side[sink], "sink reachable after max flow");
        let edges: Vec<EdgeId> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| source_side[e.from] && !source_side[e.to])
            .map(|(i, _)| EdgeId(i))
            .collect();
        let value: f64 = edges.iter().map(|id| self.edges[id.0].capacity).sum();
        debug_assert!(
            (value - flow).abs() <= 1e-9 * flow.max(1.0),
            "cut value {} differs from flow {}",
            value,
            flow
        );
        Some(MinCut {
            value,
            source_side,
            edges,
        })
    }
}
