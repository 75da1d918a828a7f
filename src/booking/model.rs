//! Booking records, the per-session draft, and step inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hours::WorkingHoursRecord;
use crate::timezone::DisplaySlot;

use super::state::Step;

/// A location offering appointments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

/// A bookable staff member of one agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adviser {
    pub id: Uuid,
    pub name: String,
    pub agency_id: Uuid,
    /// At most one record per weekday.
    #[serde(default)]
    pub working_hours: Vec<WorkingHoursRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specializations: Option<String>,
}

/// A category of service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentType {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Lifecycle of a stored appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The creation request the workflow emits on confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub agency_id: Uuid,
    pub adviser_id: Uuid,
    /// Appointment type label.
    pub title: String,
    /// Canonical slot string, e.g. `"Tuesday, 15 April 2025 : 10:00 - 10:30"`.
    pub date: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: AppointmentStatus,
}

/// A stored appointment as the persistence collaborator returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub adviser_id: Uuid,
    pub title: String,
    pub date: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AppointmentRecord {
    pub fn from_new(id: Uuid, new: NewAppointment) -> Self {
        Self {
            id,
            agency_id: new.agency_id,
            adviser_id: new.adviser_id,
            title: new.title,
            date: new.date,
            customer_name: new.customer_name,
            customer_email: new.customer_email,
            customer_phone: new.customer_phone,
            status: new.status,
            notes: None,
        }
    }

    pub fn contact(&self) -> ContactUpdate {
        ContactUpdate {
            customer_name: self.customer_name.clone(),
            customer_email: self.customer_email.clone(),
            customer_phone: self.customer_phone.clone(),
        }
    }
}

/// Customer contact fields edited at the modify step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

/// Values entered so far. Each field is written only by the step that owns
/// it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub agency_id: Option<Uuid>,
    pub appointment_type_id: Option<Uuid>,
    pub adviser_id: Option<Uuid>,
    pub selected_start: Option<DateTime<Utc>>,
    pub selected_end: Option<DateTime<Utc>>,
    pub client_time_zone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub terms_accepted: bool,
}

impl BookingDraft {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// `"<first> <last>"` as stored on the appointment.
    pub fn customer_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
    }
}

/// One customer's pass through the workflow. Owned by the caller; the
/// workflow only mutates what it is handed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSession {
    pub current_step: Step,
    pub draft: BookingDraft,
    /// Appointment located by phone, pending contact edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify_target: Option<Uuid>,
}

impl WorkflowSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to step 1 with nothing entered.
    pub fn reset(&mut self) {
        self.current_step = Step::Agency;
        self.draft.clear();
        self.modify_target = None;
    }
}

/// Calendar selection as the UI submits it: raw instant strings plus the
/// browser's zone id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSelection {
    pub start: String,
    pub end: String,
    pub time_zone: String,
}

/// Personal details entered at step 5.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub terms_accepted: bool,
}

/// Data submitted with a "Next" action, one variant per input step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepInput {
    Agency { agency_id: Option<Uuid> },
    AppointmentType { appointment_type_id: Option<Uuid> },
    Adviser { adviser_id: Option<Uuid> },
    DateTime(SlotSelection),
    PersonalInfo(PersonalInfo),
}

impl StepInput {
    /// The step this input belongs to.
    pub fn step(&self) -> Step {
        match self {
            Self::Agency { .. } => Step::Agency,
            Self::AppointmentType { .. } => Step::AppointmentType,
            Self::Adviser { .. } => Step::Adviser,
            Self::DateTime(_) => Step::DateTime,
            Self::PersonalInfo(_) => Step::PersonalInfo,
        }
    }
}

/// What step 6 shows before the customer confirms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationSummary {
    pub agency: String,
    pub appointment_type: String,
    pub adviser: String,
    pub date: String,
    pub time: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Prefill for the personal-info step, plus the chosen slot for context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonalInfoForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<DisplaySlot>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub terms_accepted: bool,
}
