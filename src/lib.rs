pub mod protocol;
pub mod network;
pub mod algorithms;
pub mod config;

/// Node identifier, in `[0, N)` for a network of `N` nodes.
pub type NodeId = usize;

/// Link or path cost. [`INFINITY`] marks an unreachable destination.
pub type Cost = u32;

pub const INFINITY: Cost = Cost::MAX;

/// Adds two costs, saturating at [`INFINITY`].
pub fn add_cost(a: Cost, b: Cost) -> Cost {
    if a == INFINITY || b == INFINITY {
        INFINITY
    } else {
        a.saturating_add(b)
    }
}

/// Renders a cost the way the distance tables print it.
pub fn format_cost(cost: Cost) -> String {
    if cost == INFINITY {
        "inf".to_string()
    } else {
        cost.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_saturates_at_infinity() {
        assert_eq!(add_cost(3, 4), 7);
        assert_eq!(add_cost(INFINITY, 0), INFINITY);
        assert_eq!(add_cost(1, INFINITY), INFINITY);
        assert_eq!(add_cost(INFINITY - 1, 5), INFINITY);
    }

    #[test]
    fn infinity_prints_as_inf() {
        assert_eq!(format_cost(INFINITY), "inf");
        assert_eq!(format_cost(12), "12");
    }
}
