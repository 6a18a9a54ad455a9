pub mod auth;
pub mod complaints;
pub mod crews;
pub mod itineraries;
pub mod work_orders;
