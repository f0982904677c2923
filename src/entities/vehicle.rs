use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub plate: String,
    pub seats: u8,
    pub active: bool,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    /// A vehicle qualifies for a ride when it is in service, has passed
    /// verification and can seat the requested party.
    pub fn qualifies_for(&self, seats: u8) -> bool {
        self.active && self.verified && self.seats >= seats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(seats: u8) -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            plate: "KJA-123-XY".into(),
            seats,
            active: true,
            verified: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn seat_count_gates_qualification() {
        assert!(vehicle(4).qualifies_for(4));
        assert!(!vehicle(4).qualifies_for(5));
    }

    #[test]
    fn inactive_or_unverified_vehicles_never_qualify() {
        let mut v = vehicle(4);
        v.active = false;
        assert!(!v.qualifies_for(1));

        let mut v = vehicle(4);
        v.verified = false;
        assert!(!v.qualifies_for(1));
    }
}
