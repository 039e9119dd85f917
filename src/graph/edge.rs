use crate::graph::objective_graph::{FactorIndex, VariableIndex};
use crate::graph::weight::{MessageWeight, WeightStore, WeightedValue};

// One edge of the bipartite objective graph, joining a variable to a factor.
// Carries the primal pair (x from the factor side, z from the variable side),
// the scaled dual accumulator u, the weights of the two directional messages,
// and the message history read by the convergence test.
//
// Derived messages: `z - u` travels to the factor, `x + u` to the variable.
#[derive(Debug, Clone)]
pub struct EdgeData<W: WeightStore> {
    variable: VariableIndex,
    factor: Option<FactorIndex>,
    x: f64,
    z: f64,
    u: f64,
    weight_to_left: W,  // weight of the message to the factor
    weight_to_right: W, // weight of the message to the variable
    enabled: bool,
    old_msg: Option<f64>,  // previous message to the factor
    msg_diff: Option<f64>, // |current - previous| message to the factor
}

impl<W: WeightStore> EdgeData<W> {
    // Creates an enabled edge seeded with its variable's initial state
    pub fn new(variable: VariableIndex, value: f64, weight: MessageWeight) -> Self {
        EdgeData {
            variable,
            factor: None,
            x: value,
            z: value,
            u: 0.0,
            weight_to_left: W::store(weight),
            weight_to_right: W::store(weight),
            enabled: true,
            old_msg: None,
            msg_diff: None,
        }
    }

    // Restores the edge to a freshly-created state around the given pair
    pub fn reset(&mut self, value: f64, weight: MessageWeight) {
        self.x = value;
        self.z = value;
        self.u = 0.0;
        self.weight_to_left = W::store(weight);
        self.weight_to_right = W::store(weight);
        self.enabled = true;
        self.old_msg = None;
        self.msg_diff = None;
    }

    pub fn variable(&self) -> VariableIndex {
        self.variable
    }

    pub fn factor(&self) -> Option<FactorIndex> {
        self.factor
    }

    // Attaches the edge to the factor that will drive its left side
    pub fn bind_factor(&mut self, factor: FactorIndex) {
        assert!(
            self.factor.is_none(),
            "edge is already bound to factor {}",
            self.factor.unwrap()
        );
        self.factor = Some(factor);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn message_to_factor(&self) -> f64 {
        self.z - self.u
    }

    pub fn weight_to_factor(&self) -> MessageWeight {
        self.weight_to_left.load()
    }

    pub fn message_to_variable(&self) -> f64 {
        self.x + self.u
    }

    pub fn weight_to_variable(&self) -> MessageWeight {
        self.weight_to_right.load()
    }

    pub fn dual(&self) -> f64 {
        self.u
    }

    // Change of the message to the factor across the last completed
    // iteration; undefined until two factor sweeps have run.
    pub fn msg_diff(&self) -> Option<f64> {
        self.msg_diff
    }

    // Absorbs the slot a factor's minimizer wrote for this edge. The message
    // history is sampled here, once per iteration, so the convergence test
    // always compares messages as they stood after the factor sweep.
    pub fn absorb_from_factor(&mut self, result: WeightedValue) {
        self.x = result.value;
        self.weight_to_right = W::store(result.weight);

        let msg = self.z - self.u;
        if let Some(old) = self.old_msg {
            self.msg_diff = Some((msg - old).abs());
        }
        self.old_msg = Some(msg);

        if self.weight_to_right.load() == MessageWeight::Inf {
            self.u = 0.0;
        }
    }

    // Absorbs the consensus pair the variable's equality rule produced.
    // Certainty on the incoming side clears the dual accumulator: no
    // residual correction persists past a statement of fact.
    pub fn absorb_from_variable(
        &mut self,
        value: f64,
        weight: MessageWeight,
        learning_rate: f64,
    ) {
        self.z = value;
        self.weight_to_left = W::store(weight);
        if self.weight_to_left.load() == MessageWeight::Inf {
            self.u = 0.0;
        } else {
            self.u += learning_rate * (self.x - self.z);
        }
    }
}
