use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::equality::Algorithm;
use crate::graph::objective_graph::{GraphOptions, ObjectiveGraph, VariableIndex};
use crate::graph::weight::{MessageWeight, WeightedValue};

// Circle packing in the unit square: one variable per coordinate, a
// no-overlap factor per circle pair, and an in-range factor per circle.
// Factors with nothing to correct echo their inputs with zero weight.

// Coordinate-variable handles of one encoded packing instance
pub struct PackingEncoding {
    positions: Vec<(VariableIndex, VariableIndex)>,
    radius: f64,
}

impl PackingEncoding {
    pub fn num_circles(&self) -> usize {
        self.positions.len()
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    // Reads back the circle centers
    pub fn layout<A: Algorithm>(&self, graph: &ObjectiveGraph<A>) -> Vec<(f64, f64)> {
        self.positions
            .iter()
            .map(|&(x, y)| (graph.value(x), graph.value(y)))
            .collect()
    }

    // Largest pairwise violation of the no-overlap constraint; 0.0 for a
    // fully separated layout
    pub fn max_overlap<A: Algorithm>(&self, graph: &ObjectiveGraph<A>) -> f64 {
        let layout = self.layout(graph);
        let min_dist = 2.0 * self.radius;
        let mut worst = 0.0f64;
        for (index, &(xi, yi)) in layout.iter().enumerate() {
            for &(xj, yj) in layout.iter().skip(index + 1) {
                let dist = ((xj - xi).powi(2) + (yj - yi).powi(2)).sqrt();
                worst = worst.max(min_dist - dist);
            }
        }
        worst
    }
}

// Encodes `num_circles` circles of the given radius, dropped uniformly at
// random into the unit square with the given seed
pub fn encode<A: Algorithm>(
    num_circles: usize,
    radius: f64,
    options: GraphOptions,
    rng_seed: u64,
) -> (ObjectiveGraph<A>, PackingEncoding) {
    let mut rng = StdRng::seed_from_u64(rng_seed);
    let mut graph = ObjectiveGraph::new(options);
    let (low, high) = (radius, 1.0 - radius);

    let positions: Vec<(VariableIndex, VariableIndex)> = (0..num_circles)
        .map(|_| {
            let x = graph.create_variable(rng.gen_range(low..high), MessageWeight::Std);
            let y = graph.create_variable(rng.gen_range(low..high), MessageWeight::Std);
            (x, y)
        })
        .collect();

    let min_dist = 2.0 * radius;
    for i in 0..num_circles {
        for j in (i + 1)..num_circles {
            let edges = vec![
                graph.create_edge(positions[i].0),
                graph.create_edge(positions[i].1),
                graph.create_edge(positions[j].0),
                graph.create_edge(positions[j].1),
            ];
            graph.create_factor(edges, move |slots: &mut [WeightedValue]| {
                separate_pair(slots, min_dist)
            });
        }
    }

    for &(x, y) in &positions {
        let edges = vec![graph.create_edge(x), graph.create_edge(y)];
        graph.create_factor(edges, move |slots: &mut [WeightedValue]| {
            clamp_in_range(slots, low, high)
        });
    }

    debug!(
        "Encoded {} circles of radius {}: {} variables, {} factors, {} edges",
        num_circles,
        radius,
        graph.num_variables(),
        graph.num_factors(),
        graph.num_edges()
    );
    (graph, PackingEncoding { positions, radius })
}

// Projects two overlapping circles to exactly `min_dist` apart, moving both
// centers along their connecting line; separated circles are echoed back
// with zero weight
fn separate_pair(slots: &mut [WeightedValue], min_dist: f64) {
    let (xi, yi) = (slots[0].value, slots[1].value);
    let (xj, yj) = (slots[2].value, slots[3].value);
    let (dx, dy) = (xj - xi, yj - yi);
    let dist = (dx * dx + dy * dy).sqrt();

    if dist >= min_dist {
        for slot in slots.iter_mut() {
            slot.weight = MessageWeight::Zero;
        }
        return;
    }

    // coincident centers separate along the x axis
    let (ux, uy) = if dist > 0.0 {
        (dx / dist, dy / dist)
    } else {
        (1.0, 0.0)
    };
    let (cx, cy) = ((xi + xj) / 2.0, (yi + yj) / 2.0);
    let half = min_dist / 2.0;

    slots[0] = WeightedValue::new(cx - ux * half, MessageWeight::Std);
    slots[1] = WeightedValue::new(cy - uy * half, MessageWeight::Std);
    slots[2] = WeightedValue::new(cx + ux * half, MessageWeight::Std);
    slots[3] = WeightedValue::new(cy + uy * half, MessageWeight::Std);
}

// Clamps every coordinate into `[low, high]`; coordinates already in range
// are echoed back with zero weight
fn clamp_in_range(slots: &mut [WeightedValue], low: f64, high: f64) {
    for slot in slots.iter_mut() {
        let clamped = slot.value.clamp(low, high);
        *slot = if clamped == slot.value {
            WeightedValue::new(slot.value, MessageWeight::Zero)
        } else {
            WeightedValue::new(clamped, MessageWeight::Std)
        };
    }
}
