//! Force-directed layout of the persona similarity graph
//!
//! Nodes start evenly spaced on a circle. Each iteration pushes every pair
//! apart (inverse square) and pulls edge endpoints together in proportion to
//! distance and similarity, then applies the net force as a position delta
//! and clamps into the bounding box. The iteration count is fixed; there is
//! no convergence check, so results depend on the constants below.

use eyre::Result;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::persona::Persona;
use crate::similarity::{SimilarityEdge, compute_similarities};

/// Node count above which the O(N²) repulsion pass gets slow
pub const LARGE_LAYOUT_THRESHOLD: usize = 500;

/// Layout constants
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub iterations: usize,
    /// Repulsion constant; force = repulsion / distance²
    pub repulsion: f64,
    /// Attraction coefficient; force = distance * attraction * similarity
    pub attraction: f64,
    /// Radius of the initial circle
    pub radius: f64,
    pub center_x: f64,
    pub center_y: f64,
    /// Lower bound for both axes
    pub min: f64,
    /// Upper bound for both axes
    pub max: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 50,
            repulsion: 1000.0,
            attraction: 0.01,
            radius: 100.0,
            center_x: 200.0,
            center_y: 200.0,
            min: 50.0,
            max: 350.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("repulsion", self.repulsion),
            ("attraction", self.attraction),
            ("radius", self.radius),
            ("center_x", self.center_x),
            ("center_y", self.center_y),
            ("min", self.min),
            ("max", self.max),
        ] {
            if !value.is_finite() {
                eyre::bail!("Layout {} must be finite, got {}", name, value);
            }
        }
        if self.min > self.max {
            eyre::bail!("Layout bounds are inverted: min {} > max {}", self.min, self.max);
        }
        Ok(())
    }
}

/// Position of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// A positioned persona, ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct LayoutNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub payload: Persona,
}

/// Place nodes evenly on the configured circle
pub fn initial_positions<S: AsRef<str>>(ids: &[S], config: &LayoutConfig) -> Vec<Position> {
    let n = ids.len() as f64;
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let angle = 2.0 * PI * i as f64 / n;
            Position {
                id: id.as_ref().to_string(),
                x: angle.cos() * config.radius + config.center_x,
                y: angle.sin() * config.radius + config.center_y,
            }
        })
        .collect()
}

/// Run one relaxation iteration in place.
///
/// Edges whose endpoints are not both among `positions` are ignored.
pub fn step(positions: &mut [Position], edges: &[SimilarityEdge], config: &LayoutConfig) {
    let index: IndexMap<&str, usize> = positions
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();
    let resolved: Vec<(usize, usize, f64)> = edges
        .iter()
        .filter_map(|e| Some((*index.get(e.source.as_str())?, *index.get(e.target.as_str())?, e.similarity)))
        .collect();
    drop(index);

    apply_forces(positions, &resolved, config);
}

fn apply_forces(positions: &mut [Position], edges: &[(usize, usize, f64)], config: &LayoutConfig) {
    let mut forces = vec![(0.0_f64, 0.0_f64); positions.len()];

    for j in 0..positions.len() {
        for k in (j + 1)..positions.len() {
            let (dx, dy, distance) = separation(&positions[j], &positions[k]);
            let force = config.repulsion / (distance * distance);
            let (fx, fy) = (dx / distance * force, dy / distance * force);

            forces[j].0 -= fx;
            forces[j].1 -= fy;
            forces[k].0 += fx;
            forces[k].1 += fy;
        }
    }

    for &(source, target, similarity) in edges {
        let (dx, dy, distance) = separation(&positions[source], &positions[target]);
        let force = distance * config.attraction * similarity;
        let (fx, fy) = (dx / distance * force, dy / distance * force);

        forces[source].0 += fx;
        forces[source].1 += fy;
        forces[target].0 -= fx;
        forces[target].1 -= fy;
    }

    for (pos, (fx, fy)) in positions.iter_mut().zip(forces) {
        pos.x = (pos.x + fx).clamp(config.min, config.max);
        pos.y = (pos.y + fy).clamp(config.min, config.max);
    }
}

/// Vector from `a` to `b` and its length, never below 1
fn separation(a: &Position, b: &Position) -> (f64, f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let distance = (dx * dx + dy * dy).sqrt();
    let distance = if distance == 0.0 { 1.0 } else { distance };
    (dx, dy, distance)
}

/// Lay out the nodes named by a set of edges.
///
/// Node order is first appearance across the edges (source, then target).
pub fn compute_positions(edges: &[SimilarityEdge], config: &LayoutConfig) -> Vec<Position> {
    let ids: IndexSet<&str> = edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();
    let ids: Vec<&str> = ids.into_iter().collect();

    relax(&ids, edges, config)
}

/// Lay out personas by trait similarity.
///
/// Every persona becomes a node, so a single persona (or a set with no
/// edges between distinct slugs) still gets a position.
pub fn compute_layout(personas: &[Persona], config: &LayoutConfig) -> Result<Vec<LayoutNode>> {
    config.validate()?;
    let edges = compute_similarities(personas)?;
    let ids: Vec<&str> = personas.iter().map(|p| p.slug.as_str()).collect();

    let positions = relax(&ids, &edges, config);

    Ok(positions
        .into_iter()
        .zip(personas)
        .map(|(pos, persona)| LayoutNode {
            id: pos.id,
            x: pos.x,
            y: pos.y,
            label: persona.name.clone(),
            payload: persona.clone(),
        })
        .collect())
}

fn relax(ids: &[&str], edges: &[SimilarityEdge], config: &LayoutConfig) -> Vec<Position> {
    if ids.len() > LARGE_LAYOUT_THRESHOLD {
        log::warn!(
            "Laying out {} nodes; repulsion is quadratic in node count and may be slow",
            ids.len()
        );
    }

    let mut positions = initial_positions(ids, config);
    for _ in 0..config.iterations {
        step(&mut positions, edges, config);
    }

    log::debug!(
        "Layout finished: {} nodes, {} edges, {} iterations",
        positions.len(),
        edges.len(),
        config.iterations
    );
    positions
}
