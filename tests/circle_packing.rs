use mp_graph::problems::packing;
use mp_graph::{Admm, Algorithm, GraphOptions, ThreeWeight};

const RADIUS: f64 = 0.0504;
const CONVERGENCE_DELTA: f64 = 1e-5;

fn pack_100_circles<A: Algorithm>(max_iterations: usize) {
    let mut options = GraphOptions::new(0.07);
    options.set_convergence_delta(CONVERGENCE_DELTA);
    let (mut graph, encoding) = packing::encode::<A>(100, RADIUS, options, 777);

    while !graph.iterate() {
        assert!(
            graph.iterations() < max_iterations,
            "no convergence after {} iterations",
            graph.iterations()
        );
    }

    assert!(
        encoding.max_overlap(&graph) < 100.0 * CONVERGENCE_DELTA,
        "converged layout still overlaps by {}",
        encoding.max_overlap(&graph)
    );
    for (x, y) in encoding.layout(&graph) {
        assert!((RADIUS - 1e-3..=1.0 - RADIUS + 1e-3).contains(&x));
        assert!((RADIUS - 1e-3..=1.0 - RADIUS + 1e-3).contains(&y));
    }
}

#[test]
fn packing_converges_with_twa() {
    pack_100_circles::<ThreeWeight>(10_000);
}

#[test]
fn packing_converges_with_admm() {
    pack_100_circles::<Admm>(50_000);
}
