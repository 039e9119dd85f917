use std::mem;

use bitvec::prelude::LocalBits;
use bitvec::vec::BitVec;
use log::debug;

use crate::graph::edge::EdgeData;
use crate::graph::equality::Algorithm;
use crate::graph::factor::FactorData;
use crate::graph::variable::VariableData;
use crate::graph::weight::{MessageWeight, WeightedValue};
use crate::runtime::sweep::{for_each_index, for_each_listed, DisjointSlots};

pub type VariableIndex = usize;
pub type FactorIndex = usize;
pub type EdgeIndex = usize;

// Below this fraction of enabled factors the factor sweep enumerates the
// enabled set; at or above it, scanning all factors and skipping disabled
// ones inline is cheaper than the enumeration.
const SPARSE_SWEEP_RATIO: f64 = 0.15;

// Stores options for an objective graph solver
#[derive(Debug, Clone)]
pub struct GraphOptions {
    learning_rate: f64,     // step size of the dual updates
    convergence_delta: f64, // message-change threshold for convergence
    parallel: bool,         // run the sweeps on the rayon pool
}

impl GraphOptions {
    // Returns options with the given learning rate and defaults otherwise
    pub fn new(learning_rate: f64) -> Self {
        GraphOptions {
            learning_rate,
            convergence_delta: 1e-5,
            parallel: true,
        }
    }

    // Sets the step size of the dual updates
    pub fn set_learning_rate(&mut self, value: f64) -> &mut Self {
        self.learning_rate = value;
        self
    }

    // Sets the message-change threshold for convergence
    pub fn set_convergence_delta(&mut self, value: f64) -> &mut Self {
        self.convergence_delta = value;
        self
    }

    // Sets whether the sweeps run on the rayon pool
    pub fn set_parallel(&mut self, value: bool) -> &mut Self {
        self.parallel = value;
        self
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn convergence_delta(&self) -> f64 {
        self.convergence_delta
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }
}

type Callback<A> = Box<dyn FnMut(&mut ObjectiveGraph<A>)>;

// Root container of the bipartite objective graph: variables, factors, and
// the edges joining them, stored in contiguous vectors under dense stable
// indices. The algorithm type parameter binds the equality rule and the
// per-edge weight storage once, at construction.
//
// One iteration runs the factor sweep (local minimizers), then the variable
// sweep (equality rule), then the convergence test on per-edge message
// changes, then the registered iteration callbacks.
pub struct ObjectiveGraph<A: Algorithm> {
    variables: Vec<VariableData>,
    factors: Vec<FactorData>,
    edges: Vec<EdgeData<A::Weight>>,
    enabled_factors: BitVec<usize, LocalBits>,
    num_enabled_factors: usize,
    options: GraphOptions,
    iterations: usize,
    converged: bool,
    sealed: bool,
    iterate_callbacks: Vec<Callback<A>>,
    reinit_callbacks: Vec<Callback<A>>,
}

impl<A: Algorithm> ObjectiveGraph<A> {
    // Creates an empty graph with the given options
    pub fn new(options: GraphOptions) -> Self {
        ObjectiveGraph {
            variables: Vec::new(),
            factors: Vec::new(),
            edges: Vec::new(),
            enabled_factors: BitVec::new(),
            num_enabled_factors: 0,
            options,
            iterations: 0,
            converged: false,
            sealed: false,
            iterate_callbacks: Vec::new(),
            reinit_callbacks: Vec::new(),
        }
    }

    // Creates a variable holding the given initial pair
    pub fn create_variable(
        &mut self,
        initial_value: f64,
        initial_weight: MessageWeight,
    ) -> VariableIndex {
        assert!(
            !self.sealed,
            "graph structure is fixed once iteration begins"
        );
        self.variables
            .push(VariableData::new(initial_value, initial_weight));
        self.variables.len() - 1
    }

    // Creates an edge attached to the given variable; the factor side is
    // bound later, by the factor-creation call that lists the edge
    pub fn create_edge(&mut self, variable: VariableIndex) -> EdgeIndex {
        assert!(
            !self.sealed,
            "graph structure is fixed once iteration begins"
        );
        assert!(variable < self.variables.len(), "no such variable");
        let edge = self.edges.len();
        let variable_data = &mut self.variables[variable];
        self.edges.push(EdgeData::new(
            variable,
            variable_data.initial_value(),
            variable_data.initial_weight(),
        ));
        variable_data.attach_edge(edge);
        edge
    }

    // Creates a factor over the given edges. The minimizer sees its exchange
    // buffer in exactly this edge order.
    pub fn create_factor<M>(&mut self, edges: Vec<EdgeIndex>, minimizer: M) -> FactorIndex
    where
        M: Fn(&mut [WeightedValue]) + Send + Sync + 'static,
    {
        assert!(
            !self.sealed,
            "graph structure is fixed once iteration begins"
        );
        let factor = self.factors.len();
        for &edge in &edges {
            assert!(edge < self.edges.len(), "no such edge");
            self.edges[edge].bind_factor(factor);
        }
        self.factors.push(FactorData::new(edges, Box::new(minimizer)));
        self.enabled_factors.push(true);
        self.num_enabled_factors += 1;
        factor
    }

    // Returns the current value of a variable. Until the variable's first
    // equality sweep this is its initial value.
    pub fn value(&self, variable: VariableIndex) -> f64 {
        self.variables[variable].value()
    }

    pub fn factor_enabled(&self, factor: FactorIndex) -> bool {
        self.enabled_factors[factor]
    }

    // Enables or disables a factor; returns whether the call changed state.
    // Must not be called while an iteration phase is active (the borrow
    // rules already rule that out for safe callers).
    pub fn set_factor_enabled(&mut self, factor: FactorIndex, enabled: bool) -> bool {
        if enabled {
            self.enable_factor(factor)
        } else {
            self.disable_factor(factor)
        }
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_enabled_factors(&self) -> usize {
        self.num_enabled_factors
    }

    pub fn num_enabled_edges(&self) -> usize {
        self.edges.iter().filter(|edge| edge.is_enabled()).count()
    }

    pub fn learning_rate(&self) -> f64 {
        self.options.learning_rate()
    }

    pub fn set_learning_rate(&mut self, value: f64) {
        self.options.set_learning_rate(value);
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    // Appends a callback fired after every completed iteration
    pub fn on_iterate<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Self) + 'static,
    {
        self.iterate_callbacks.push(Box::new(callback));
    }

    // Appends a callback fired after every reinitialization
    pub fn on_reinit<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Self) + 'static,
    {
        self.reinit_callbacks.push(Box::new(callback));
    }

    // Runs one iteration and returns whether the graph has converged. On an
    // already-converged graph this is a no-op that returns true and fires no
    // callbacks.
    pub fn iterate(&mut self) -> bool {
        if self.converged {
            return true;
        }
        if !self.sealed {
            self.seal();
        }

        self.factor_sweep();
        self.variable_sweep();
        self.iterations += 1;
        self.converged = self.test_convergence();
        if self.converged {
            debug!("Converged after {} iterations", self.iterations);
        }
        self.fire_iterate_callbacks();
        self.converged
    }

    // Restores the as-constructed state: initial values and weights, every
    // factor enabled, duals and message history cleared. Fires the
    // reinitialization callbacks.
    pub fn reinitialize(&mut self) {
        debug!("Reinitializing graph");
        for variable in self.variables.iter_mut() {
            variable.reset();
        }
        for index in 0..self.edges.len() {
            let variable = &self.variables[self.edges[index].variable()];
            let (value, weight) = (variable.initial_value(), variable.initial_weight());
            self.edges[index].reset(value, weight);
        }
        self.enabled_factors.fill(true);
        self.num_enabled_factors = self.factors.len();
        self.iterations = 0;
        self.converged = false;
        self.fire_reinit_callbacks();
    }

    fn seal(&mut self) {
        for (index, edge) in self.edges.iter().enumerate() {
            assert!(
                edge.factor().is_some(),
                "edge {} was never attached to a factor",
                index
            );
        }
        self.sealed = true;
        debug!(
            "Iteration begins over {} variables, {} factors, {} edges",
            self.variables.len(),
            self.factors.len(),
            self.edges.len()
        );
    }

    // Runs every enabled factor's local minimizer and absorbs the results
    // into the factor side of its edges
    fn factor_sweep(&mut self) {
        let total = self.factors.len();
        if total == 0 {
            return;
        }
        let parallel = self.options.parallel();
        let dense = self.num_enabled_factors as f64 / total as f64 >= SPARSE_SWEEP_RATIO;
        let sparse_indices: Vec<usize> = if dense {
            Vec::new()
        } else {
            self.enabled_factors.iter_ones().collect()
        };

        let edges = DisjointSlots::new(&mut self.edges);
        let factors = DisjointSlots::new(&mut self.factors);
        let enabled = &self.enabled_factors;

        let run = |factor_index: usize| {
            if !enabled[factor_index] {
                return;
            }
            // Safety: each factor is visited once per sweep and touches only
            // the edges bound to it
            let factor = unsafe { factors.get_mut(factor_index) };
            factor.minimize_step(
                |edge| {
                    let edge = unsafe { edges.get(edge) };
                    WeightedValue::new(edge.message_to_factor(), edge.weight_to_factor())
                },
                |edge, result| {
                    let edge = unsafe { edges.get_mut(edge) };
                    edge.absorb_from_factor(result);
                },
            );
        };

        if dense {
            for_each_index(parallel, total, run);
        } else {
            for_each_listed(parallel, &sparse_indices, run);
        }
    }

    // Runs the equality rule for every variable and absorbs the consensus
    // into the variable side of its enabled edges
    fn variable_sweep(&mut self) {
        let parallel = self.options.parallel();
        let learning_rate = self.options.learning_rate();
        let edges = DisjointSlots::new(&mut self.edges);
        let variables = DisjointSlots::new(&mut self.variables);

        for_each_index(parallel, variables.len(), |variable_index| {
            // Safety: each variable is visited once per sweep and touches
            // only the edges incident to it
            let variable = unsafe { variables.get_mut(variable_index) };
            if variable.needs_enabled_update() {
                variable.rebuild_enabled_edges(|edge| unsafe { edges.get(edge) }.is_enabled());
            }
            let consensus = A::consensus(variable.enabled_edges().iter().map(|&edge| {
                let edge = unsafe { edges.get(edge) };
                (edge.message_to_variable(), edge.weight_to_variable())
            }));
            let Some((value, weight)) = consensus else {
                return; // no enabled edges: the variable keeps its value
            };
            variable.set_value(value);
            for &edge in variable.enabled_edges() {
                let edge = unsafe { edges.get_mut(edge) };
                edge.absorb_from_variable(value, weight, learning_rate);
            }
        });
    }

    // The graph has converged once every enabled edge has message history
    // and no recorded change exceeds the threshold
    fn test_convergence(&self) -> bool {
        self.edges
            .iter()
            .filter(|edge| edge.is_enabled())
            .all(|edge| match edge.msg_diff() {
                Some(diff) => diff <= self.options.convergence_delta(),
                None => false,
            })
    }

    fn disable_factor(&mut self, factor: FactorIndex) -> bool {
        if !self.enabled_factors[factor] {
            return false;
        }
        self.enabled_factors.set(factor, false);
        self.num_enabled_factors -= 1;
        for &edge in self.factors[factor].edges() {
            let variable = self.edges[edge].variable();
            self.edges[edge].set_enabled(false);
            self.variables[variable].mark_enabled_dirty();
        }
        debug!("Disabled factor {}", factor);
        true
    }

    // Enabling pays the initialization cost disabling deferred: the
    // factor's edges restart from the variable's current value and are
    // appended to the enabled subset directly, without an O(deg) filter.
    fn enable_factor(&mut self, factor: FactorIndex) -> bool {
        if self.enabled_factors[factor] {
            return false;
        }
        self.enabled_factors.set(factor, true);
        self.num_enabled_factors += 1;
        for &edge in self.factors[factor].edges() {
            let variable = self.edges[edge].variable();
            let value = self.variables[variable].value();
            self.edges[edge].reset(value, MessageWeight::Std);
            self.variables[variable].push_enabled_edge(edge);
        }
        debug!("Enabled factor {}", factor);
        true
    }

    fn fire_iterate_callbacks(&mut self) {
        let mut callbacks = mem::take(&mut self.iterate_callbacks);
        for callback in callbacks.iter_mut() {
            callback(self);
        }
        let added = mem::replace(&mut self.iterate_callbacks, callbacks);
        self.iterate_callbacks.extend(added);
    }

    fn fire_reinit_callbacks(&mut self) {
        let mut callbacks = mem::take(&mut self.reinit_callbacks);
        for callback in callbacks.iter_mut() {
            callback(self);
        }
        let added = mem::replace(&mut self.reinit_callbacks, callbacks);
        self.reinit_callbacks.extend(added);
    }
}
