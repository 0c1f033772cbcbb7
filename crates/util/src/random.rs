use rand::{rngs::OsRng, Rng};

/// Returns a random integer in `[minimum, maximum)` drawn from the operating
/// system CSPRNG.
///
/// Fuzz values produced here may end up in security-relevant positions
/// (tokens, identifiers), so a seedable statistical PRNG is not used.
///
/// # Panics
///
/// Panics if `minimum >= maximum`. Use [`checked_randint`] when the bounds
/// are computed at runtime.
///
/// # Examples
///
/// ```
/// use apifuzzer_util::secure_randint;
///
/// let n = secure_randint(1, 10);
/// assert!((1..10).contains(&n));
/// ```
pub fn secure_randint(minimum: i64, maximum: i64) -> i64 {
    OsRng.gen_range(minimum..maximum)
}

/// Like [`secure_randint`], but returns `None` for an empty range.
///
/// # Examples
///
/// ```
/// use apifuzzer_util::checked_randint;
///
/// assert_eq!(checked_randint(4, 5), Some(4));
/// assert_eq!(checked_randint(5, 5), None);
/// ```
pub fn checked_randint(minimum: i64, maximum: i64) -> Option<i64> {
    if minimum >= maximum {
        return None;
    }
    Some(secure_randint(minimum, maximum))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_randint_bounds() {
        for _ in 0..10_000 {
            let n = secure_randint(0, 10);
            assert!((0..10).contains(&n), "{n} out of range");
        }
    }

    #[test]
    fn test_secure_randint_negative_range() {
        for _ in 0..100 {
            let n = secure_randint(-5, -1);
            assert!((-5..-1).contains(&n));
        }
    }

    #[test]
    fn test_secure_randint_single_value() {
        assert_eq!(secure_randint(7, 8), 7);
    }

    #[test]
    #[should_panic]
    fn test_secure_randint_empty_range() {
        secure_randint(3, 3);
    }

    #[test]
    fn test_checked_randint_empty_and_inverted() {
        assert_eq!(checked_randint(3, 3), None);
        assert_eq!(checked_randint(10, 0), None);
        assert_eq!(checked_randint(i64::MAX, i64::MIN), None);
    }

    #[test]
    fn test_checked_randint_in_range() {
        for _ in 0..100 {
            let n = checked_randint(-3, 3).unwrap();
            assert!((-3..3).contains(&n));
        }
        assert_eq!(checked_randint(i64::MAX - 1, i64::MAX), Some(i64::MAX - 1));
    }
}
