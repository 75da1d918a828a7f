//! `BookingStore` trait: the async persistence port the workflow talks to.

use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::model::{
    Adviser, Agency, AppointmentRecord, AppointmentType, ContactUpdate, NewAppointment,
};
use crate::error::StoreError;

/// Backend-agnostic persistence for agencies, advisers, appointment types
/// and appointments.
#[async_trait]
pub trait BookingStore: Send + Sync {
    // ── Agencies ────────────────────────────────────────────────────

    /// All agencies, in display order.
    async fn list_agencies(&self) -> Result<Vec<Agency>, StoreError>;

    /// Get an agency by ID.
    async fn load_agency(&self, id: Uuid) -> Result<Option<Agency>, StoreError>;

    // ── Advisers ────────────────────────────────────────────────────

    /// Advisers attached to one agency.
    async fn list_advisers_by_agency(&self, agency_id: Uuid) -> Result<Vec<Adviser>, StoreError>;

    /// Get an adviser (with working hours) by ID.
    async fn load_adviser(&self, id: Uuid) -> Result<Option<Adviser>, StoreError>;

    // ── Appointment types ───────────────────────────────────────────

    async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, StoreError>;

    async fn load_appointment_type(&self, id: Uuid) -> Result<Option<AppointmentType>, StoreError>;

    // ── Appointments ────────────────────────────────────────────────

    /// Every stored appointment.
    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, StoreError>;

    /// First appointment whose customer phone equals `phone` exactly.
    async fn find_appointment_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<AppointmentRecord>, StoreError>;

    async fn load_appointment(&self, id: Uuid) -> Result<Option<AppointmentRecord>, StoreError>;

    /// Persist a new appointment and return it with its assigned id.
    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<AppointmentRecord, StoreError>;

    /// Overwrite the customer contact fields of an existing appointment.
    async fn update_appointment_contact(
        &self,
        id: Uuid,
        contact: ContactUpdate,
    ) -> Result<(), StoreError>;
}
