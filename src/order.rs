//! Traversal and storage order preferences.

use std::fmt;

/// Requested order in which the elements of a layout are visited.
///
/// `Order` carries no state; it only parameterizes compaction and traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Order {
    /// Row-major: the last axis varies fastest.
    #[default]
    C,
    /// Column-major: the first axis varies fastest.
    F,
    /// Storage order: axes visited from the smallest absolute stride to the
    /// largest, zero-stride (broadcast) axes slowest.
    S,
    /// Don't care: whichever order yields the longest contiguous runs.
    A,
}

impl Order {
    /// Resolve to a concrete `C` or `F`, mapping `S` and `A` to the default.
    ///
    /// Used where no strides exist to consult, e.g. allocating a dense layout.
    pub fn auto_fc(order: Order) -> Order {
        match order {
            Order::F => Order::F,
            _ => Order::default(),
        }
    }

    /// The order that traverses axes in the opposite direction.
    pub fn reverse(self) -> Order {
        match self {
            Order::C => Order::F,
            Order::F => Order::C,
            other => other,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Order::C => "C",
            Order::F => "F",
            Order::S => "S",
            Order::A => "A",
        };
        f.write_str(name)
    }
}
