// Weight tags carried by every message in the objective graph, and the
// per-edge storage schemes that specialize them by algorithm.

// Confidence attached to a message: no information, standard, or certainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageWeight {
    Zero,
    #[default]
    Std,
    Inf,
}

impl MessageWeight {
    // Numeric projection of the tag, for clients that need a number.
    // The tag itself remains the sole source of truth inside the solver.
    pub fn to_f64(self) -> f64 {
        match self {
            MessageWeight::Zero => 0.0,
            MessageWeight::Std => 1.0,
            MessageWeight::Inf => f64::INFINITY,
        }
    }
}

// One exchange slot: a value paired with the weight of the message carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightedValue {
    pub value: f64,
    pub weight: MessageWeight,
}

impl WeightedValue {
    pub fn new(value: f64, weight: MessageWeight) -> Self {
        WeightedValue { value, weight }
    }
}

// Storage scheme for the two directional weights of an edge. The algorithm
// chosen at graph construction fixes the scheme, so edges of an ADMM graph
// spend no memory on weights at all.
pub trait WeightStore: Copy + Default + Send + Sync + 'static {
    fn store(weight: MessageWeight) -> Self;
    fn load(self) -> MessageWeight;
}

// ADMM weight storage: both directional weights are logically pinned to
// `Std`, so nothing is stored and every write is absorbed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdWeight;

impl WeightStore for StdWeight {
    fn store(_weight: MessageWeight) -> Self {
        StdWeight
    }

    fn load(self) -> MessageWeight {
        MessageWeight::Std
    }
}

// TWA weight storage: the tag is kept as written.
impl WeightStore for MessageWeight {
    fn store(weight: MessageWeight) -> Self {
        weight
    }

    fn load(self) -> MessageWeight {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_projection() {
        assert_eq!(MessageWeight::Zero.to_f64(), 0.0);
        assert_eq!(MessageWeight::Std.to_f64(), 1.0);
        assert_eq!(MessageWeight::Inf.to_f64(), f64::INFINITY);
    }

    #[test]
    fn std_storage_pins_every_write_to_std() {
        for weight in [MessageWeight::Zero, MessageWeight::Std, MessageWeight::Inf] {
            assert_eq!(StdWeight::store(weight).load(), MessageWeight::Std);
        }
    }

    #[test]
    fn tagged_storage_passes_writes_through() {
        for weight in [MessageWeight::Zero, MessageWeight::Std, MessageWeight::Inf] {
            assert_eq!(MessageWeight::store(weight).load(), weight);
        }
    }
}
