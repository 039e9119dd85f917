use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::equality::Algorithm;
use crate::graph::objective_graph::{GraphOptions, ObjectiveGraph, VariableIndex};
use crate::graph::weight::{MessageWeight, WeightedValue};

// One-hot Sudoku encoding: one indicator variable per (cell, digit),
// exactly-one-of-k factors per cell, per (row, digit), per (column, digit)
// and per (box, digit), and a single-edge pinning factor per given cell.

// A square puzzle of side `box_size^2`; `givens` is cell-major and holds the
// fixed digit where one is present.
pub struct SudokuPuzzle {
    size: usize,
    box_size: usize,
    givens: Vec<Option<usize>>,
}

impl SudokuPuzzle {
    pub fn new(box_size: usize, givens: Vec<Option<usize>>) -> Self {
        let size = box_size * box_size;
        assert_eq!(givens.len(), size * size, "givens must cover every cell");
        assert!(
            givens.iter().flatten().all(|&digit| digit < size),
            "given digits must lie in 0..{}",
            size
        );
        SudokuPuzzle {
            size,
            box_size,
            givens,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn box_size(&self) -> usize {
        self.box_size
    }

    pub fn given(&self, row: usize, col: usize) -> Option<usize> {
        self.givens[row * self.size + col]
    }

    pub fn num_givens(&self) -> usize {
        self.givens.iter().flatten().count()
    }
}

// Builds a puzzle by masking cells of a complete valid grid with the given
// probability of keeping each cell
pub fn demo_puzzle(box_size: usize, fraction_given: f64, rng_seed: u64) -> SudokuPuzzle {
    let size = box_size * box_size;
    let mut rng = StdRng::seed_from_u64(rng_seed);
    let givens = (0..size * size)
        .map(|cell| {
            let (row, col) = (cell / size, cell % size);
            let digit = (box_size * (row % box_size) + row / box_size + col) % size;
            (rng.gen::<f64>() < fraction_given).then_some(digit)
        })
        .collect();
    SudokuPuzzle::new(box_size, givens)
}

// Indicator-variable handles of one encoded puzzle
pub struct SudokuEncoding {
    size: usize,
    box_size: usize,
    indicators: Vec<VariableIndex>, // cell-major, digit-minor
}

impl SudokuEncoding {
    fn indicator(&self, row: usize, col: usize, digit: usize) -> VariableIndex {
        self.indicators[(row * self.size + col) * self.size + digit]
    }

    // Reads back the digit with the strongest indicator in each cell
    pub fn decode<A: Algorithm>(&self, graph: &ObjectiveGraph<A>) -> Vec<usize> {
        (0..self.size * self.size)
            .map(|cell| {
                let (row, col) = (cell / self.size, cell % self.size);
                (0..self.size)
                    .max_by(|&a, &b| {
                        let value_a = graph.value(self.indicator(row, col, a));
                        let value_b = graph.value(self.indicator(row, col, b));
                        value_a.total_cmp(&value_b)
                    })
                    .unwrap()
            })
            .collect()
    }
}

// Encodes a puzzle into an objective graph. Indicators start from seeded
// uniform noise to break the symmetry between equivalent completions.
pub fn encode<A: Algorithm>(
    puzzle: &SudokuPuzzle,
    options: GraphOptions,
    rng_seed: u64,
) -> (ObjectiveGraph<A>, SudokuEncoding) {
    let size = puzzle.size();
    let box_size = puzzle.box_size();
    let mut rng = StdRng::seed_from_u64(rng_seed);
    let mut graph = ObjectiveGraph::new(options);

    let indicators = (0..size * size * size)
        .map(|_| graph.create_variable(rng.gen(), MessageWeight::Std))
        .collect();
    let encoding = SudokuEncoding {
        size,
        box_size,
        indicators,
    };

    // exactly one digit per cell
    for row in 0..size {
        for col in 0..size {
            let edges = (0..size)
                .map(|digit| graph.create_edge(encoding.indicator(row, col, digit)))
                .collect();
            graph.create_factor(edges, one_of_k);
        }
    }

    // each digit exactly once per row
    for row in 0..size {
        for digit in 0..size {
            let edges = (0..size)
                .map(|col| graph.create_edge(encoding.indicator(row, col, digit)))
                .collect();
            graph.create_factor(edges, one_of_k);
        }
    }

    // each digit exactly once per column
    for col in 0..size {
        for digit in 0..size {
            let edges = (0..size)
                .map(|row| graph.create_edge(encoding.indicator(row, col, digit)))
                .collect();
            graph.create_factor(edges, one_of_k);
        }
    }

    // each digit exactly once per box
    for band in 0..box_size {
        for stack in 0..box_size {
            for digit in 0..size {
                let edges = (0..size)
                    .map(|slot| {
                        let row = band * box_size + slot / box_size;
                        let col = stack * box_size + slot % box_size;
                        graph.create_edge(encoding.indicator(row, col, digit))
                    })
                    .collect();
                graph.create_factor(edges, one_of_k);
            }
        }
    }

    // pin the given cells
    for row in 0..size {
        for col in 0..size {
            if let Some(digit) = puzzle.given(row, col) {
                let edge = graph.create_edge(encoding.indicator(row, col, digit));
                graph.create_factor(vec![edge], |slots: &mut [WeightedValue]| {
                    slots[0] = WeightedValue::new(1.0, MessageWeight::Inf);
                });
            }
        }
    }

    debug!(
        "Encoded {}x{} puzzle with {} givens: {} variables, {} factors, {} edges",
        size,
        size,
        puzzle.num_givens(),
        graph.num_variables(),
        graph.num_factors(),
        graph.num_edges()
    );
    (graph, encoding)
}

// Exactly-one-of-k local minimizer: writes 1.0 on the slot with the largest
// incoming message and 0.0 elsewhere. Certain inputs constrain the choice:
// a certain 1 fixes the slot, certain 0s exclude slots, and a choice with
// only one candidate left is itself emitted as certain.
fn one_of_k(slots: &mut [WeightedValue]) {
    let mut chosen = None;
    let mut candidates = 0usize;
    let mut best = None;
    let mut best_value = f64::NEG_INFINITY;

    for (index, slot) in slots.iter().enumerate() {
        if slot.weight == MessageWeight::Inf {
            if slot.value > 0.5 {
                chosen = Some(index);
                break;
            }
            continue; // certainly not this slot
        }
        candidates += 1;
        if slot.value > best_value {
            best_value = slot.value;
            best = Some(index);
        }
    }

    let (winner, certain) = match (chosen, best) {
        (Some(index), _) => (index, true),
        (None, Some(index)) => (index, candidates == 1),
        // inconsistent certain inputs; emit an arbitrary slot
        (None, None) => (0, false),
    };

    for (index, slot) in slots.iter_mut().enumerate() {
        let already_excluded = slot.weight == MessageWeight::Inf && slot.value <= 0.5;
        *slot = if index == winner {
            WeightedValue::new(1.0, if certain { MessageWeight::Inf } else { MessageWeight::Std })
        } else if certain || already_excluded {
            WeightedValue::new(0.0, MessageWeight::Inf)
        } else {
            WeightedValue::new(0.0, MessageWeight::Std)
        };
    }
}

// Checks that `grid` is a complete valid solution of `puzzle`
pub fn is_valid_solution(puzzle: &SudokuPuzzle, grid: &[usize]) -> bool {
    let size = puzzle.size();
    let box_size = puzzle.box_size();
    if grid.len() != size * size || grid.iter().any(|&digit| digit >= size) {
        return false;
    }

    for row in 0..size {
        for col in 0..size {
            if let Some(digit) = puzzle.given(row, col) {
                if grid[row * size + col] != digit {
                    return false;
                }
            }
        }
    }

    let all_distinct = |cells: &[usize]| {
        let mut seen = vec![false; size];
        cells.iter().all(|&cell| !std::mem::replace(&mut seen[grid[cell]], true))
    };

    for index in 0..size {
        let row: Vec<usize> = (0..size).map(|col| index * size + col).collect();
        let col: Vec<usize> = (0..size).map(|row| row * size + index).collect();
        let boxed: Vec<usize> = (0..size)
            .map(|slot| {
                let row = (index / box_size) * box_size + slot / box_size;
                let col = (index % box_size) * box_size + slot % box_size;
                row * size + col
            })
            .collect();
        if !all_distinct(&row) || !all_distinct(&col) || !all_distinct(&boxed) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::equality::{Admm, ThreeWeight};

    const STD: MessageWeight = MessageWeight::Std;
    const INF: MessageWeight = MessageWeight::Inf;

    #[test]
    fn one_of_k_picks_the_largest_message() {
        let mut slots = vec![
            WeightedValue::new(0.2, STD),
            WeightedValue::new(0.9, STD),
            WeightedValue::new(0.4, STD),
        ];
        one_of_k(&mut slots);
        assert_eq!(slots[0], WeightedValue::new(0.0, STD));
        assert_eq!(slots[1], WeightedValue::new(1.0, STD));
        assert_eq!(slots[2], WeightedValue::new(0.0, STD));
    }

    #[test]
    fn one_of_k_obeys_a_certain_one() {
        let mut slots = vec![
            WeightedValue::new(5.0, STD),
            WeightedValue::new(1.0, INF),
            WeightedValue::new(0.0, STD),
        ];
        one_of_k(&mut slots);
        assert_eq!(slots[0], WeightedValue::new(0.0, INF));
        assert_eq!(slots[1], WeightedValue::new(1.0, INF));
        assert_eq!(slots[2], WeightedValue::new(0.0, INF));
    }

    #[test]
    fn one_of_k_turns_certain_when_one_candidate_remains() {
        let mut slots = vec![
            WeightedValue::new(0.0, INF),
            WeightedValue::new(0.0, INF),
            WeightedValue::new(0.1, STD),
        ];
        one_of_k(&mut slots);
        assert_eq!(slots[0], WeightedValue::new(0.0, INF));
        assert_eq!(slots[1], WeightedValue::new(0.0, INF));
        assert_eq!(slots[2], WeightedValue::new(1.0, INF));
    }

    #[test]
    fn demo_puzzle_base_grid_is_valid() {
        let puzzle = demo_puzzle(3, 1.0, 7);
        let grid: Vec<usize> = (0..81).map(|cell| puzzle.given(cell / 9, cell % 9).unwrap()).collect();
        assert!(is_valid_solution(&puzzle, &grid));
    }

    fn solve_4x4<A: Algorithm>(max_iterations: usize) {
        let puzzle = demo_puzzle(2, 0.5, 11);
        let mut options = GraphOptions::new(1.0);
        options.set_parallel(false);
        let (mut graph, encoding) = encode::<A>(&puzzle, options, 777);

        while !graph.iterate() {
            assert!(
                graph.iterations() < max_iterations,
                "no convergence after {} iterations",
                max_iterations
            );
        }
        let grid = encoding.decode(&graph);
        assert!(is_valid_solution(&puzzle, &grid));
    }

    #[test]
    fn solves_a_4x4_puzzle_with_twa() {
        solve_4x4::<ThreeWeight>(2000);
    }

    #[test]
    fn solves_a_4x4_puzzle_with_admm() {
        solve_4x4::<Admm>(5000);
    }
}
