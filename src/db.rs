pub mod complaint_repo;
pub use complaint_repo::ComplaintRepository;
pub mod crew_repo;
pub use crew_repo::CrewRepository;
pub mod employee_repo;
pub use employee_repo::EmployeeRepository;
pub mod itinerary_repo;
pub use itinerary_repo::ItineraryRepository;
pub mod work_order_repo;
pub use work_order_repo::WorkOrderRepository;
