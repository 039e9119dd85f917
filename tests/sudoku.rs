use mp_graph::problems::sudoku;
use mp_graph::{Admm, Algorithm, GraphOptions, ThreeWeight};

fn solve_16x16<A: Algorithm>(max_iterations: usize) {
    let puzzle = sudoku::demo_puzzle(4, 0.6, 4242);
    let (mut graph, encoding) = sudoku::encode::<A>(&puzzle, GraphOptions::new(1.0), 777);

    while !graph.iterate() {
        assert!(
            graph.iterations() < max_iterations,
            "no convergence after {} iterations",
            graph.iterations()
        );
    }

    let grid = encoding.decode(&graph);
    assert!(
        sudoku::is_valid_solution(&puzzle, &grid),
        "decoded grid is not a valid solution"
    );
}

#[test]
fn sudoku_16x16_converges_with_twa() {
    solve_16x16::<ThreeWeight>(5_000);
}

#[test]
fn sudoku_16x16_converges_with_admm() {
    solve_16x16::<Admm>(20_000);
}
