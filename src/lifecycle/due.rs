//! "Due today" sets, derived on read

use chrono::NaiveDate;

use crate::models::{Reservation, ReservationStatus};

/// Approved, not yet picked up, and its window starts `today`
pub fn is_pickup_due(reservation: &Reservation, today: NaiveDate) -> bool {
    reservation.status == ReservationStatus::Approved
        && !reservation.is_checked_out()
        && reservation.start_date == today
}

/// Approved, not yet returned, and its return date has arrived
pub fn is_return_due(reservation: &Reservation, today: NaiveDate) -> bool {
    reservation.status == ReservationStatus::Approved
        && !reservation.is_returned()
        && today >= reservation.return_date
}

pub fn pickup_due(reservations: Vec<Reservation>, today: NaiveDate) -> Vec<Reservation> {
    reservations
        .into_iter()
        .filter(|r| is_pickup_due(r, today))
        .collect()
}

pub fn return_due(reservations: Vec<Reservation>, today: NaiveDate) -> Vec<Reservation> {
    reservations
        .into_iter()
        .filter(|r| is_return_due(r, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::testing::reservation;
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_pickup_due_only_on_start_day() {
        let mut r = reservation(1, 1, day(1), day(5));
        assert!(!is_pickup_due(&r, day(1)));
        r.status = ReservationStatus::Approved;
        assert!(is_pickup_due(&r, day(1)));
        assert!(!is_pickup_due(&r, day(2)));
        assert!(!is_pickup_due(&r, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()));
        r.checkout_date = Some(Utc::now());
        assert!(!is_pickup_due(&r, day(1)));
    }

    #[test]
    fn test_return_due_from_return_date_on() {
        let mut r = reservation(1, 1, day(1), day(5));
        r.status = ReservationStatus::Approved;
        assert!(!is_return_due(&r, day(4)));
        assert!(is_return_due(&r, day(5)));
        assert!(is_return_due(&r, day(6)));
        r.status = ReservationStatus::Completed;
        assert!(!is_return_due(&r, day(6)));
    }
}
