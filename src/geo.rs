use serde::Serialize;
use utoipa::ToSchema;

const EARTH_RADIUS_KM: f64 = 6371.0;

const BASE_FEE: i64 = 20;
const FREE_DELIVERY_KM: f64 = 3.0;
const PER_KM_CHARGE: i64 = 5;

const BASE_TIME_MINS: i64 = 20;
const TIME_PER_KM_MINS: f64 = 5.0;

/// Delivery economics when either side has no usable coordinates.
const FALLBACK_FEE: i64 = 40;
const FALLBACK_TIME: &str = "30-40 mins";

/// Fixed estimate for dine-in orders; nothing travels, the kitchen does.
pub const DINE_IN_TIME: &str = "15-20 mins";

/// Great-circle distance via the haversine formula, rounded to 2 decimals.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    ((EARTH_RADIUS_KM * c) * 100.0).round() / 100.0
}

/// Base 20, first 3 km free beyond the base, then 5 per started kilometer.
pub fn delivery_fee(distance: f64) -> i64 {
    if distance <= FREE_DELIVERY_KM {
        return BASE_FEE;
    }
    let extra = distance - FREE_DELIVERY_KM;
    BASE_FEE + (extra.ceil() as i64) * PER_KM_CHARGE
}

/// Base 20 minutes plus 5 per started kilometer, shown as a range.
pub fn estimate_delivery_time(distance: f64) -> String {
    let total = BASE_TIME_MINS + (distance * TIME_PER_KM_MINS).ceil() as i64;
    format!("{}-{} mins", total - 5, total + 10)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryQuote {
    pub distance_km: f64,
    pub fee: i64,
    pub estimated_time: String,
}

impl DeliveryQuote {
    pub fn compute(rest_lat: f64, rest_lon: f64, user_lat: f64, user_lon: f64) -> Self {
        let distance = distance_km(rest_lat, rest_lon, user_lat, user_lon);
        Self {
            distance_km: distance,
            fee: delivery_fee(distance),
            estimated_time: estimate_delivery_time(distance),
        }
    }

    /// Flat-rate quote used when the restaurant has no location set or the
    /// customer supplied no coordinates.
    pub fn fallback() -> Self {
        Self {
            distance_km: 0.0,
            fee: FALLBACK_FEE,
            estimated_time: FALLBACK_TIME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_of_identical_points_is_zero() {
        assert_eq!(distance_km(12.9716, 77.5946, 12.9716, 77.5946), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = distance_km(12.9716, 77.5946, 13.0827, 80.2707);
        let b = distance_km(13.0827, 80.2707, 12.9716, 77.5946);
        assert_eq!(a, b);
    }

    #[test]
    fn known_distance_bangalore_chennai() {
        // ~290 km as the crow flies.
        let d = distance_km(12.9716, 77.5946, 13.0827, 80.2707);
        assert!((280.0..300.0).contains(&d), "got {d}");
    }

    #[test]
    fn fee_tiers() {
        assert_eq!(delivery_fee(0.0), 20);
        assert_eq!(delivery_fee(3.0), 20);
        assert_eq!(delivery_fee(3.1), 25);
        assert_eq!(delivery_fee(10.0), 55);
    }

    #[test]
    fn fee_is_monotonic_in_distance() {
        let mut last = 0;
        for tenth in 0..200 {
            let fee = delivery_fee(tenth as f64 / 10.0);
            assert!(fee >= last, "fee dropped at {} km", tenth as f64 / 10.0);
            last = fee;
        }
    }

    #[test]
    fn eta_literals() {
        assert_eq!(estimate_delivery_time(0.0), "15-30 mins");
        assert_eq!(estimate_delivery_time(10.0), "65-80 mins");
    }

    #[test]
    fn fallback_quote_is_flat_rate() {
        let quote = DeliveryQuote::fallback();
        assert_eq!(quote.fee, 40);
        assert_eq!(quote.distance_km, 0.0);
        assert_eq!(quote.estimated_time, "30-40 mins");
    }

    #[test]
    fn computed_quote_ties_fee_and_eta_to_distance() {
        let quote = DeliveryQuote::compute(12.9716, 77.5946, 12.9716, 77.5946);
        assert_eq!(quote.distance_km, 0.0);
        assert_eq!(quote.fee, 20);
        assert_eq!(quote.estimated_time, "15-30 mins");
    }
}
