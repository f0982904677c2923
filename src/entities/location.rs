use serde::{Deserialize, Serialize};

use crate::error::{validation_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(validation_error(format!(
                "latitude {} is out of range",
                self.latitude
            )));
        }

        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(validation_error(format!(
                "longitude {} is out of range",
                self.longitude
            )));
        }

        Ok(())
    }
}

/// A geocoded point with its human-readable address, as captured from the
/// client at ride creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Place {
    pub coordinates: Coordinates,
    pub address: String,
}

impl Place {
    pub fn validate(&self) -> Result<(), Error> {
        self.coordinates.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Coordinates::new(90.1, 0.0).validate().is_err());
        assert!(Coordinates::new(-91.0, 0.0).validate().is_err());
        assert!(Coordinates::new(0.0, 180.5).validate().is_err());
        assert!(Coordinates::new(0.0, -181.0).validate().is_err());
    }

    #[test]
    fn accepts_boundary_coordinates() {
        assert!(Coordinates::new(90.0, 180.0).validate().is_ok());
        assert!(Coordinates::new(-90.0, -180.0).validate().is_ok());
    }
}
