pub mod graph {
    pub mod edge;
    pub mod equality;
    pub mod exchange;
    pub mod factor;
    pub mod objective_graph;
    pub mod variable;
    pub mod weight;
}

pub mod runtime {
    pub mod sweep;
}

pub mod problems {
    pub mod packing;
    pub mod sudoku;
}

pub use graph::equality::{Admm, Algorithm, ThreeWeight};
pub use graph::objective_graph::{
    EdgeIndex, FactorIndex, GraphOptions, ObjectiveGraph, VariableIndex,
};
pub use graph::weight::{MessageWeight, WeightedValue};
