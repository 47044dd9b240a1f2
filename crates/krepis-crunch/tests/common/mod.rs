//! Shared test models
//!
//! Compiled into the integration tests, the bench and the crate's own unit
//! tests (as `domain::testing`), so every suite walks the same graphs.
//!
//! - `Graph`: explicit transition graph with accepting flags, error codes and
//!   choice edges, encodable for the disk pipeline
//! - `RaceModel`: two processes under a `RoundRobinScheduler`, with an
//!   optional ordering bug that only a delayed schedule reaches

#![allow(dead_code)]

use krepis_crunch::domain::scheduler::{DelayingScheduler, ProcessId, RoundRobinScheduler};
use krepis_crunch::{
    Bounds, Cutoff, Fingerprint, Model, PositionCodec, PositionStatus, TraversalPosition,
};
use rand::{Rng, RngCore};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ============================================================================
// Graph Model
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: usize,
    choice: bool,
}

#[derive(Debug, Default)]
struct GraphData {
    edges: Vec<Vec<Edge>>,
    accepting: Vec<bool>,
    errors: HashMap<usize, u32>,
}

/// Builder for [`Graph`]; node 0 is initial
pub struct GraphBuilder {
    data: GraphData,
}

impl GraphBuilder {
    pub fn new(nodes: usize) -> Self {
        Self {
            data: GraphData {
                edges: vec![Vec::new(); nodes],
                accepting: vec![false; nodes],
                errors: HashMap::new(),
            },
        }
    }

    pub fn edge(mut self, from: usize, to: usize) -> Self {
        self.data.edges[from].push(Edge { to, choice: false });
        self
    }

    /// Edge that consumes one bounded choice
    pub fn choice_edge(mut self, from: usize, to: usize) -> Self {
        self.data.edges[from].push(Edge { to, choice: true });
        self
    }

    pub fn accepting(mut self, node: usize) -> Self {
        self.data.accepting[node] = true;
        self
    }

    pub fn error(mut self, node: usize, code: u32) -> Self {
        self.data.errors.insert(node, code);
        self
    }

    pub fn build(self) -> Graph {
        Graph {
            data: Arc::new(self.data),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    data: Arc<GraphData>,
}

impl Graph {
    pub fn nodes(&self) -> usize {
        self.data.edges.len()
    }
}

#[derive(Debug, Clone)]
pub struct GraphPos {
    data: Arc<GraphData>,
    path: Arc<Vec<usize>>,
    bounds: Bounds,
    magic: bool,
    cursor: usize,
}

impl GraphPos {
    pub fn node(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }

    fn follow(&self, edge: Edge) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(edge.to);
        let bounds = if edge.choice {
            self.bounds.step().with_choice()
        } else {
            self.bounds.step()
        };
        Self {
            data: Arc::clone(&self.data),
            path: Arc::new(path),
            bounds,
            magic: self.magic,
            cursor: 0,
        }
    }
}

impl TraversalPosition for GraphPos {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.node() as u64)
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn magic_bit(&self) -> bool {
        self.magic
    }

    fn with_magic_bit(&self, magic_bit: bool) -> Self {
        Self {
            magic: magic_bit,
            cursor: 0,
            ..self.clone()
        }
    }

    fn is_accepting(&self) -> bool {
        self.data.accepting[self.node()]
    }

    fn status(&self) -> PositionStatus {
        match self.data.errors.get(&self.node()) {
            Some(&code) => PositionStatus::Error { code },
            None if self.data.edges[self.node()].is_empty() => PositionStatus::Terminated,
            None => PositionStatus::Running,
        }
    }

    fn successor_count(&self) -> usize {
        self.data.edges[self.node()].len()
    }

    fn next_successor(&mut self, _cutoff: &Cutoff) -> Option<Self> {
        let edge = *self.data.edges[self.node()].get(self.cursor)?;
        self.cursor += 1;
        Some(self.follow(edge))
    }

    fn random_successor(&self, rng: &mut dyn RngCore) -> Option<Self> {
        let edges = &self.data.edges[self.node()];
        if edges.is_empty() {
            return None;
        }
        Some(self.follow(edges[rng.gen_range(0..edges.len())]))
    }

    fn trace(&self) -> Vec<Fingerprint> {
        self.path.iter().map(|&n| Fingerprint::new(n as u64)).collect()
    }
}

impl Model for Graph {
    type Position = GraphPos;

    fn initial_position(&self) -> GraphPos {
        GraphPos {
            data: Arc::clone(&self.data),
            path: Arc::new(vec![0]),
            bounds: Bounds::ROOT,
            magic: false,
            cursor: 0,
        }
    }
}

/// `[depth, delay, choice, magic, path_len, path...]`, all u32 big-endian
impl PositionCodec<GraphPos> for Graph {
    fn encode(&self, position: &GraphPos, out: &mut Vec<u8>) {
        let b = position.bounds;
        for word in [b.depth, b.delay, b.choice_cost, u32::from(position.magic)] {
            out.extend_from_slice(&word.to_be_bytes());
        }
        out.extend_from_slice(&(position.path.len() as u32).to_be_bytes());
        for &node in position.path.iter() {
            out.extend_from_slice(&(node as u32).to_be_bytes());
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<GraphPos, String> {
        if bytes.len() % 4 != 0 || bytes.len() < 24 {
            return Err(format!("bad position length {}", bytes.len()));
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let path: Vec<usize> = words[5..].iter().map(|&n| n as usize).collect();
        if path.len() != words[4] as usize {
            return Err("path length mismatch".to_string());
        }
        if path.iter().any(|&n| n >= self.nodes()) {
            return Err("unknown node".to_string());
        }
        Ok(GraphPos {
            data: Arc::clone(&self.data),
            path: Arc::new(path),
            bounds: Bounds::new(words[0], words[1], words[2]),
            magic: words[3] != 0,
            cursor: 0,
        })
    }
}

/// `0 -> 1 -> ... -> n-1`
pub fn chain(nodes: usize) -> Graph {
    (1..nodes)
        .fold(GraphBuilder::new(nodes), |b, n| b.edge(n - 1, n))
        .build()
}

/// `width x height` grid, edges right and down; `width * height` states
pub fn grid(width: usize, height: usize) -> GraphBuilder {
    let id = |x: usize, y: usize| y * width + x;
    let mut builder = GraphBuilder::new(width * height);
    for y in 0..height {
        for x in 0..width {
            if x + 1 < width {
                builder = builder.edge(id(x, y), id(x + 1, y));
            }
            if y + 1 < height {
                builder = builder.edge(id(x, y), id(x, y + 1));
            }
        }
    }
    builder
}

/// Root with `fanout` children, each heading a chain of `length` states
pub fn broom(fanout: usize, length: usize) -> GraphBuilder {
    let nodes = 1 + fanout * length;
    let mut builder = GraphBuilder::new(nodes);
    for branch in 0..fanout {
        let head = 1 + branch * length;
        builder = builder.edge(0, head);
        for step in 1..length {
            builder = builder.edge(head + step - 1, head + step);
        }
    }
    builder
}

// ============================================================================
// Scheduler-Driven Race Model
// ============================================================================

/// Error code of the ordering bug
pub const RACE_BUG: u32 = 7;

/// Process 0 and process 1 each take `steps` steps. With `buggy`, process 1
/// reaching its second step before process 0 finishes is an error. The
/// round robin policy runs process 0 to completion first, so the bug needs
/// one delay followed by a regular step.
#[derive(Debug, Clone)]
pub struct RaceModel {
    pub steps: u32,
    pub max_delays: u32,
    pub buggy: bool,
}

#[derive(Debug, Clone)]
pub struct RacePos {
    model: Arc<RaceModel>,
    pcs: [u32; 2],
    scheduler: RoundRobinScheduler,
    bounds: Bounds,
    magic: bool,
    cursor: usize,
    path: Arc<Vec<Fingerprint>>,
}

impl RacePos {
    /// `(process, delayed)` choices available from here
    fn choices(&self) -> Vec<(ProcessId, bool)> {
        let mut choices = Vec::new();
        let Some(first) = self.scheduler.next() else {
            return choices;
        };
        choices.push((first, false));
        let mut delayed = self.scheduler.clone();
        if delayed.delay() {
            if let Some(other) = delayed.next() {
                if other != first {
                    choices.push((other, true));
                }
            }
        }
        choices
    }

    fn run(&self, process: ProcessId, delayed: bool) -> Self {
        let mut scheduler = self.scheduler.clone();
        let mut bounds = self.bounds.step();
        if delayed {
            scheduler.delay();
            bounds = bounds.delayed();
        }
        let mut pcs = self.pcs;
        pcs[process.0] += 1;
        if pcs[process.0] == self.model.steps {
            scheduler.finish(process).expect("running process was started");
        }
        let mut next = Self {
            model: Arc::clone(&self.model),
            pcs,
            scheduler,
            bounds,
            magic: self.magic,
            cursor: 0,
            path: Arc::clone(&self.path),
        };
        let mut path = (*self.path).clone();
        path.push(next.fingerprint());
        next.path = Arc::new(path);
        next
    }
}

impl TraversalPosition for RacePos {
    fn fingerprint(&self) -> Fingerprint {
        let mut hasher = DefaultHasher::new();
        self.pcs.hash(&mut hasher);
        self.scheduler.hash(&mut hasher);
        Fingerprint::new(hasher.finish())
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn magic_bit(&self) -> bool {
        self.magic
    }

    fn with_magic_bit(&self, magic_bit: bool) -> Self {
        Self {
            magic: magic_bit,
            cursor: 0,
            ..self.clone()
        }
    }

    fn status(&self) -> PositionStatus {
        if self.model.buggy && self.pcs[1] >= 2 && self.pcs[0] < self.model.steps {
            PositionStatus::Error { code: RACE_BUG }
        } else if self.scheduler.next().is_none() {
            PositionStatus::Terminated
        } else {
            PositionStatus::Running
        }
    }

    fn successor_count(&self) -> usize {
        self.choices().len()
    }

    fn next_successor(&mut self, _cutoff: &Cutoff) -> Option<Self> {
        let (process, delayed) = *self.choices().get(self.cursor)?;
        self.cursor += 1;
        Some(self.run(process, delayed))
    }

    fn random_successor(&self, rng: &mut dyn RngCore) -> Option<Self> {
        let choices = self.choices();
        if choices.is_empty() {
            return None;
        }
        let (process, delayed) = choices[rng.gen_range(0..choices.len())];
        Some(self.run(process, delayed))
    }

    fn trace(&self) -> Vec<Fingerprint> {
        (*self.path).clone()
    }
}

impl Model for RaceModel {
    type Position = RacePos;

    fn initial_position(&self) -> RacePos {
        let mut scheduler = RoundRobinScheduler::new(self.max_delays);
        scheduler.start(ProcessId::new(0)).expect("fresh scheduler");
        scheduler.start(ProcessId::new(1)).expect("fresh scheduler");
        let mut root = RacePos {
            model: Arc::new(self.clone()),
            pcs: [0, 0],
            scheduler,
            bounds: Bounds::ROOT,
            magic: false,
            cursor: 0,
            path: Arc::new(Vec::new()),
        };
        root.path = Arc::new(vec![root.fingerprint()]);
        root
    }
}
