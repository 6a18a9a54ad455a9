// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::get_me,

        // --- Reclamos ---
        handlers::complaints::register_complaint,

        // --- OTs ---
        handlers::work_orders::list_work_orders,
        handlers::work_orders::list_my_work_orders,
        handlers::work_orders::list_operator_work_orders,
        handlers::work_orders::get_work_order,
        handlers::work_orders::create_work_order,
        handlers::work_orders::assign_work_order,
        handlers::work_orders::assign_work_order_to_crew,
        handlers::work_orders::start_work_order,
        handlers::work_orders::complete_work_order,
        handlers::work_orders::cancel_work_order,
        handlers::work_orders::reopen_work_order,

        // --- Itinerários ---
        handlers::itineraries::list_crew_pool,
        handlers::itineraries::list_crew_pool_dates,
        handlers::itineraries::list_my_pool,
        handlers::itineraries::list_my_pool_dates,
        handlers::itineraries::claim_work_order,
        handlers::itineraries::pull_work_order,

        // --- Cuadrillas ---
        handlers::crews::list_crews,
        handlers::crews::create_crew,
        handlers::crews::list_members,
        handlers::crews::add_member,
        handlers::crews::remove_member,
    ),
    components(
        schemas(
            // --- Modelos ---
            models::work_order::WorkOrderStatus,
            models::work_order::WorkOrder,
            models::work_order::WorkOrderListItem,
            models::work_order::WorkOrderDetail,
            models::work_order::ItineraryPlacement,
            models::work_order::EventKind,
            models::work_order::WorkOrderEvent,
            models::complaint::ComplaintStatus,
            models::complaint::Complaint,
            models::crew::Crew,
            models::crew::CrewMember,
            models::crew::Employee,
            models::itinerary::PoolEntry,
            models::itinerary::PoolDay,

            // --- Payloads ---
            handlers::complaints::RegisterComplaintPayload,
            handlers::work_orders::CreateWorkOrderPayload,
            handlers::work_orders::AssignPayload,
            handlers::work_orders::AssignCrewPayload,
            handlers::work_orders::CompletePayload,
            handlers::work_orders::CancelPayload,
            handlers::itineraries::ClaimPayload,
            handlers::crews::CreateCrewPayload,
            handlers::crews::AddMemberPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Empregado autenticado"),
        (name = "Complaints", description = "Entrada de reclamos"),
        (name = "Work Orders", description = "Ciclo de vida das OTs técnicas"),
        (name = "Itineraries", description = "Pool de OTs por cuadrilla e data"),
        (name = "Crews", description = "Cuadrillas e seus membros")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
