//! Capacity guard predicates
//!
//! Pure checks consulted by the mutation handlers inside the locking
//! transaction. The server-side check is authoritative; clients may use the
//! same predicates to pre-filter full parents, but cannot race it.

/// True when a capacity is set and the counter has reached it.
/// `None` means unbounded.
pub fn is_full(capacity: Option<i32>, counter: i32) -> bool {
    match capacity {
        Some(max) => counter >= max,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_is_never_full() {
        assert!(!is_full(None, 0));
        assert!(!is_full(None, 1_000_000));
    }

    #[test]
    fn test_full_at_capacity() {
        assert!(!is_full(Some(2), 1));
        assert!(is_full(Some(2), 2));
        assert!(is_full(Some(2), 3));
    }

    #[test]
    fn test_zero_capacity_is_always_full() {
        assert!(is_full(Some(0), 0));
    }
}
