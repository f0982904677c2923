pub mod driver;
pub mod location;
pub mod negotiation;
pub mod payment;
pub mod promo;
pub mod ride;
pub mod rider;
pub mod vehicle;

pub use driver::{AccountStatus, Availability, Driver};
pub use location::{Coordinates, Place};
pub use negotiation::Negotiation;
pub use payment::Payment;
pub use promo::{DiscountKind, PromoCode};
pub use ride::{Party, Ride};
pub use rider::{Engagement, Rider};
pub use vehicle::Vehicle;
