use std::time::Instant;

use log::info;

use mp_graph::problems::{packing, sudoku};
use mp_graph::{Admm, Algorithm, GraphOptions, ObjectiveGraph, ThreeWeight};

fn main() {
    std::env::set_var("RUST_LOG", "info"); // change "info" to "debug" for debug-level logging, etc.
    env_logger::init();

    run_sudoku::<ThreeWeight>();
    run_sudoku::<Admm>();
    run_packing::<ThreeWeight>();
    run_packing::<Admm>();
}

// Iterates until convergence or the iteration budget runs out
fn drive<A: Algorithm>(graph: &mut ObjectiveGraph<A>, max_iterations: usize) -> bool {
    while !graph.iterate() {
        if graph.iterations() >= max_iterations {
            return false;
        }
    }
    true
}

fn run_sudoku<A: Algorithm>() {
    info!("Solving a 16x16 Sudoku with {}.", A::NAME);
    let puzzle = sudoku::demo_puzzle(4, 0.6, 4242);
    let (mut graph, encoding) = sudoku::encode::<A>(&puzzle, GraphOptions::new(1.0), 777);

    let time_start = Instant::now();
    let converged = drive(&mut graph, 50_000);
    let grid = encoding.decode(&graph);
    info!(
        "{}: converged = {}, iterations = {}, valid solution = {}. Elapsed time {:?}.",
        A::NAME,
        converged,
        graph.iterations(),
        sudoku::is_valid_solution(&puzzle, &grid),
        time_start.elapsed()
    );
}

fn run_packing<A: Algorithm>() {
    info!("Packing 100 circles with {}.", A::NAME);
    let (mut graph, encoding) = packing::encode::<A>(100, 0.0504, GraphOptions::new(0.07), 777);

    let time_start = Instant::now();
    let converged = drive(&mut graph, 50_000);
    info!(
        "{}: converged = {}, iterations = {}, max overlap = {:.2e}. Elapsed time {:?}.",
        A::NAME,
        converged,
        graph.iterations(),
        encoding.max_overlap(&graph),
        time_start.elapsed()
    );
}
