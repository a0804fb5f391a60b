use crate::models::BookingStatus;
use crate::BookingError;

// The whole lifecycle in one place. Callers go through
// `validate_transition` instead of scattering status checks.
const LEGAL_TRANSITIONS: &[(BookingStatus, BookingStatus)] = &[
    (BookingStatus::Pending, BookingStatus::Confirmed),
    (BookingStatus::Pending, BookingStatus::Cancelled),
    (BookingStatus::Confirmed, BookingStatus::Cancelled),
    (BookingStatus::Confirmed, BookingStatus::Completed),
];

pub fn is_legal(from: BookingStatus, to: BookingStatus) -> bool {
    LEGAL_TRANSITIONS.contains(&(from, to))
}

/// Checks a requested transition against the lifecycle table without
/// touching any state.
pub fn validate_transition(from: BookingStatus, to: BookingStatus) -> Result<(), BookingError> {
    if is_legal(from, to) {
        Ok(())
    } else {
        Err(BookingError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ];

    #[test]
    fn test_exactly_the_legal_transitions_pass() {
        for from in ALL {
            for to in ALL {
                let expected = matches!(
                    (from, to),
                    (BookingStatus::Pending, BookingStatus::Confirmed)
                        | (BookingStatus::Pending, BookingStatus::Cancelled)
                        | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                        | (BookingStatus::Confirmed, BookingStatus::Completed)
                );
                assert_eq!(
                    validate_transition(from, to).is_ok(),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [BookingStatus::Cancelled, BookingStatus::Completed] {
            for to in ALL {
                let err = validate_transition(from, to).unwrap_err();
                assert!(matches!(err, BookingError::InvalidTransition { .. }));
            }
        }
    }
}
