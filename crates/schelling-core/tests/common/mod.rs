//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use schelling_core::utility::{DimensionWise, Ratio, Similarity};
use schelling_core::{
    Agent, AgentId, AgentPool, Behavior, BehaviorMix, Graph, NodeId, Topology, TypeDimension, TypeSpace, TypeVector,
    UtilityModel,
};

pub fn n(raw: u32) -> NodeId {
    NodeId::new(raw)
}

pub fn a(raw: u32) -> AgentId {
    AgentId::new(raw)
}

pub fn color_space() -> TypeSpace {
    TypeSpace::new(vec![TypeDimension::categorical("color", ["A", "B"])]).unwrap()
}

pub fn ratio_model() -> Arc<dyn UtilityModel> {
    Arc::new(DimensionWise::new().with_term(0, 1.0, Ratio::new(Similarity::Exact)))
}

pub fn colored(id: u32, label: &str, behavior: Behavior, threshold: f64) -> Agent {
    Agent::new(a(id), TypeVector::new(vec![label.into()]), behavior, threshold)
}

/// Undirected cycle 0-1-...-(len-1)-0
pub fn cycle(len: u32) -> Graph {
    let nodes: Vec<NodeId> = (0..len).map(n).collect();
    let edges: Vec<(NodeId, NodeId)> = (0..len).map(|i| (n(i), n((i + 1) % len))).collect();
    Graph::undirected(nodes, edges).unwrap()
}

/// Undirected 4-neighbor lattice, nodes numbered row by row
pub fn lattice(width: u32, height: u32) -> Graph {
    let nodes: Vec<NodeId> = (0..width * height).map(n).collect();
    let mut edges = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let id = y * width + x;
            if x + 1 < width {
                edges.push((n(id), n(id + 1)));
            }
            if y + 1 < height {
                edges.push((n(id), n(id + width)));
            }
        }
    }
    Graph::undirected(nodes, edges).unwrap()
}

/// Random two-color population on a lattice, about a fifth of the nodes
/// left vacant.
pub fn random_world(seed: u64, width: u32, height: u32, mix: BehaviorMix, threshold: f64) -> (Topology, AgentPool) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let graph = lattice(width, height);
    let mut nodes: Vec<NodeId> = graph.nodes().collect();
    nodes.shuffle(&mut rng);
    let population = (nodes.len() * 4 / 5) as u32;

    let agents: Vec<Agent> = (0..population)
        .map(|i| {
            let label = if i % 2 == 0 { "A" } else { "B" };
            Agent::mixed(a(i), TypeVector::new(vec![label.into()]), &mix, threshold, &mut rng).unwrap()
        })
        .collect();
    let assignment: Vec<(AgentId, NodeId)> = (0..population).map(|i| (a(i), nodes[i as usize])).collect();

    let pool = AgentPool::new(&color_space(), agents).unwrap();
    let topology = Topology::new(graph, assignment).unwrap();
    (topology, pool)
}

pub fn strategic() -> BehaviorMix {
    BehaviorMix::new(0.0, 1.0, 0.0)
}

pub fn mixed() -> BehaviorMix {
    BehaviorMix::new(1.0, 1.0, 0.5)
}
