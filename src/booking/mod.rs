//! Booking workflow: a resumable, step-by-step flow that collects an
//! agency, an appointment type, an adviser, a time slot and the customer's
//! details, then records a pending appointment.
//!
//! Customers who already booked can find their appointment by phone number
//! and correct their contact details.

pub mod manager;
pub mod model;
pub mod routes;
pub mod state;

pub use manager::{BookingWorkflow, StepView};
pub use model::{
    Adviser, Agency, AppointmentRecord, AppointmentStatus, AppointmentType, BookingDraft,
    ContactUpdate, NewAppointment, PersonalInfo, SlotSelection, StepInput, WorkflowSession,
};
pub use routes::{BookingRouteState, SessionRegistry, booking_routes, spawn_prune_task};
pub use state::{Action, ActionKind, Step, Transition};
