pub mod auth;
pub use auth::AuthService;
pub mod complaint_service;
pub use complaint_service::ComplaintService;
pub mod complaint_sync;
pub mod crew_service;
pub use crew_service::CrewService;
pub mod itinerary_service;
pub use itinerary_service::ItineraryService;
pub mod work_order_service;
pub use work_order_service::WorkOrderService;
