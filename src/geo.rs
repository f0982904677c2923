//! Great-circle distance over a spherical Earth. Distances are display
//! values in kilometres, rounded to two decimals; the same rounded figure is
//! what radius filters compare against.

use crate::entities::Coordinates;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());

    let sin_dlat = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon = ((lon2 - lon1) * 0.5).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    round_2dp(EARTH_RADIUS_KM * c)
}

fn round_2dp(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates {
            latitude,
            longitude,
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        let lagos = point(6.5244, 3.3792);
        assert_eq!(haversine_km(&lagos, &lagos), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = point(6.5244, 3.3792);
        let b = point(6.4281, 3.4219);
        assert_eq!(haversine_km(&a, &b), haversine_km(&b, &a));
    }

    #[test]
    fn ikeja_to_lagos_island_fixture() {
        let driver = point(6.5244, 3.3792);
        let origin = point(6.4281, 3.4219);

        let distance = haversine_km(&driver, &origin);
        assert!((distance - 11.71).abs() < 0.05, "got {distance}");
        // outside a 10 km radius
        assert!(distance > 10.0);
    }

    #[test]
    fn short_hops_round_to_two_decimals() {
        let a = point(6.5244, 3.3792);
        let b = point(6.5250, 3.3792);

        let distance = haversine_km(&a, &b);
        assert_eq!(distance, (distance * 100.0).round() / 100.0);
    }
}
