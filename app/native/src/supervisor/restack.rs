//! Stacking order compaction.
//!
//! Active entries carry an `order` > 0; the highest order bound to a frame is
//! the front-most window. Before handing out a new order the active range is
//! shifted down so it starts at 1, which keeps orders bounded no matter how
//! often entries are raised.

/// Compacts the active orders in place and returns the next free order.
///
/// Orders equal to 0 are inactive and left alone. Calling this twice without
/// assigning the returned value yields the same result both times.
pub fn restack<'a>(orders: impl IntoIterator<Item = &'a mut u32>) -> u32 {
    let mut active: Vec<&mut u32> = orders.into_iter().filter(|o| **o > 0).collect();

    let Some(min) = active.iter().map(|o| **o).min() else {
        return 1;
    };

    if min > 1 {
        let shift = min - 1;
        for order in &mut active {
            **order -= shift;
        }
    }

    active.iter().map(|o| **o).max().map_or(1, |max| max + 1)
}
