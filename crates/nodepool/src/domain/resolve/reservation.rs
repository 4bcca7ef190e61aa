use api_types::ReservationAffinity;
use api_types::ReservationType;
use api_types::ResolvedReservationAffinity;

use crate::domain::errors::ValidationError;

/// Label key GKE matches specific reservations against.
pub const RESERVATION_NAME_KEY: &str = "compute.googleapis.com/reservation-name";

/// Validates reservation cardinality and builds the affinity sent to the
/// provider.
///
/// `SPECIFIC_RESERVATION` needs exactly one reference; every other mode needs
/// none, and the provider derives targeting from the mode alone.
pub fn resolve_reservation_affinity(
    affinity: &ReservationAffinity,
) -> Result<ResolvedReservationAffinity, ValidationError> {
    let mode = affinity.consume_reservation_type;
    let found = affinity.specific_reservations.len();

    match (mode, affinity.specific_reservations.as_slice()) {
        (ReservationType::SpecificReservation, [reservation]) => Ok(ResolvedReservationAffinity {
            consume_reservation_type: mode,
            key: Some(RESERVATION_NAME_KEY.to_string()),
            values: vec![format!(
                "projects/{}/reservations/{}",
                reservation.project, reservation.name
            )],
        }),
        (ReservationType::SpecificReservation, _) => {
            Err(ValidationError::SpecificReservationCount { found })
        }
        (_, []) => Ok(ResolvedReservationAffinity {
            consume_reservation_type: mode,
            key: None,
            values: Vec::new(),
        }),
        (_, _) => Err(ValidationError::UnexpectedSpecificReservations { mode, found }),
    }
}
