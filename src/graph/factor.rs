use crate::graph::exchange::WeightedValueExchange;
use crate::graph::objective_graph::EdgeIndex;
use crate::graph::weight::WeightedValue;

// A local minimizer: given a buffer of slots prefilled with the incoming
// messages, writes the outgoing weighted value into each slot. Slots follow
// the edge order declared at factor creation. Minimizers must not touch any
// graph state beyond their buffer; the factor sweep runs them in parallel.
pub type Minimizer = Box<dyn Fn(&mut [WeightedValue]) + Send + Sync>;

// Stores one factor of the objective graph: its ordered edge list, the
// opaque local minimizer, and the exchange buffer marshalling messages in
// and out of it.
pub struct FactorData {
    edges: Vec<EdgeIndex>,
    minimizer: Minimizer,
    exchange: WeightedValueExchange,
}

impl FactorData {
    pub fn new(edges: Vec<EdgeIndex>, minimizer: Minimizer) -> Self {
        let exchange = WeightedValueExchange::new(edges.len());
        FactorData {
            edges,
            minimizer,
            exchange,
        }
    }

    pub fn edges(&self) -> &[EdgeIndex] {
        &self.edges
    }

    // Runs one local-minimization step: fills the exchange buffer with the
    // message `incoming` reads for each edge, runs the minimizer, and hands
    // each slot result back out through `outgoing`.
    pub fn minimize_step<In, Out>(&mut self, mut incoming: In, mut outgoing: Out)
    where
        In: FnMut(EdgeIndex) -> WeightedValue,
        Out: FnMut(EdgeIndex, WeightedValue),
    {
        for (slot, &edge) in self.exchange.slots_mut().iter_mut().zip(self.edges.iter()) {
            *slot = incoming(edge);
        }
        (self.minimizer)(self.exchange.slots_mut());
        for (&edge, &slot) in self.edges.iter().zip(self.exchange.slots().iter()) {
            outgoing(edge, slot);
        }
    }
}
