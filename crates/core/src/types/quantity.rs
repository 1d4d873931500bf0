//! Quantity rules for cart line controls.
//!
//! The +/- controls never let a line drop below one unit (removal is a
//! separate action) and never push it past the stock ceiling when the
//! platform reports one. These checks run before any request is issued.

use serde::Serialize;

use super::cart::LineItem;

/// Smallest quantity a line may hold through quantity edits.
pub const MIN_LINE_QUANTITY: u32 = 1;

/// Rejected quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    /// The change would take the line below one unit.
    #[error("quantity cannot go below {MIN_LINE_QUANTITY}")]
    BelowMinimum,
    /// The change would exceed the units in stock.
    #[error("only {available} available, {requested} requested")]
    AboveAvailable {
        /// Quantity that was asked for.
        requested: u32,
        /// Stock ceiling.
        available: u32,
    },
}

/// State of the quantity controls for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct QuantityControls {
    /// Whether the decrement control is enabled.
    pub can_decrement: bool,
    /// Whether the increment control is enabled.
    pub can_increment: bool,
    /// Whether the "quantity limit reached" hint is shown.
    pub limit_reached: bool,
}

impl QuantityControls {
    /// Compute control state for a line.
    #[must_use]
    pub fn for_item(item: &LineItem) -> Self {
        let limit_reached = item
            .availability
            .ceiling()
            .is_some_and(|ceiling| item.quantity >= ceiling);

        Self {
            can_decrement: item.quantity > MIN_LINE_QUANTITY,
            can_increment: !limit_reached,
            limit_reached,
        }
    }
}

/// Validate an absolute target quantity for a line.
///
/// # Errors
///
/// Returns [`QuantityError::BelowMinimum`] for zero and
/// [`QuantityError::AboveAvailable`] when the ceiling is known and exceeded.
pub fn check_target(item: &LineItem, requested: u32) -> Result<u32, QuantityError> {
    if requested < MIN_LINE_QUANTITY {
        return Err(QuantityError::BelowMinimum);
    }

    match item.availability.ceiling() {
        Some(available) if requested > available => Err(QuantityError::AboveAvailable {
            requested,
            available,
        }),
        _ => Ok(requested),
    }
}

/// Quantity after pressing the increment control.
///
/// # Errors
///
/// Returns [`QuantityError::AboveAvailable`] once the stock ceiling is reached.
pub fn increment_target(item: &LineItem) -> Result<u32, QuantityError> {
    check_target(item, item.quantity.saturating_add(1))
}

/// Quantity after pressing the decrement control.
///
/// # Errors
///
/// Returns [`QuantityError::BelowMinimum`] when the line holds a single unit.
pub fn decrement_target(item: &LineItem) -> Result<u32, QuantityError> {
    if item.quantity <= MIN_LINE_QUANTITY {
        return Err(QuantityError::BelowMinimum);
    }
    // Lines already above a shrunken ceiling may still step down.
    Ok(item.quantity - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cart::fixtures::line;

    #[test]
    fn test_controls_at_minimum() {
        let controls = QuantityControls::for_item(&line("a", 1, None));
        assert!(!controls.can_decrement);
        assert!(controls.can_increment);
        assert!(!controls.limit_reached);
    }

    #[test]
    fn test_controls_at_ceiling() {
        let controls = QuantityControls::for_item(&line("a", 3, Some(3)));
        assert!(controls.can_decrement);
        assert!(!controls.can_increment);
        assert!(controls.limit_reached);
    }

    #[test]
    fn test_increment_respects_ceiling() {
        assert_eq!(increment_target(&line("a", 2, Some(3))), Ok(3));
        assert_eq!(
            increment_target(&line("a", 3, Some(3))),
            Err(QuantityError::AboveAvailable {
                requested: 4,
                available: 3
            })
        );
        assert_eq!(increment_target(&line("a", 40, None)), Ok(41));
    }

    #[test]
    fn test_decrement_floor() {
        assert_eq!(decrement_target(&line("a", 2, None)), Ok(1));
        assert_eq!(
            decrement_target(&line("a", 1, None)),
            Err(QuantityError::BelowMinimum)
        );
        assert_eq!(
            decrement_target(&line("a", 0, None)),
            Err(QuantityError::BelowMinimum)
        );
        assert_eq!(decrement_target(&line("a", 5, Some(2))), Ok(4));
    }

    #[test]
    fn test_check_target_rejects_zero() {
        assert_eq!(
            check_target(&line("a", 2, None), 0),
            Err(QuantityError::BelowMinimum)
        );
    }

    #[test]
    fn test_controls_never_leave_bounds() {
        // Walk every reachable state of a line with a ceiling of five and make
        // sure the controls and the targets agree.
        for quantity in 1..=5 {
            let item = line("a", quantity, Some(5));
            let controls = QuantityControls::for_item(&item);
            assert_eq!(controls.can_increment, increment_target(&item).is_ok());
            assert_eq!(controls.can_decrement, decrement_target(&item).is_ok());
            if let Ok(next) = increment_target(&item) {
                assert!(next <= 5);
            }
            if let Ok(next) = decrement_target(&item) {
                assert!(next >= MIN_LINE_QUANTITY);
            }
        }
    }
}
