//! Booking workflow state machine: the steps, the actions, and the table of
//! which action moves which step where.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{ContactUpdate, StepInput};

/// The steps of the booking workflow. The numeric value is the step's
/// public identifier and its serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    #[default]
    Agency = 1,
    AppointmentType = 2,
    Adviser = 3,
    DateTime = 4,
    PersonalInfo = 5,
    Confirmation = 6,
    Success = 7,
    PhoneVerification = 8,
    ModifyContact = 9,
}

impl Step {
    pub const ALL: [Step; 9] = [
        Step::Agency,
        Step::AppointmentType,
        Step::Adviser,
        Step::DateTime,
        Step::PersonalInfo,
        Step::Confirmation,
        Step::Success,
        Step::PhoneVerification,
        Step::ModifyContact,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Step> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    /// Where `action` leads from this step, or `None` if the pair is not in
    /// the table. Phone verification resolves to step 9 here; a failed
    /// lookup keeps the session where it is without consulting the table.
    pub fn transition(self, action: ActionKind) -> Option<Step> {
        use ActionKind::*;
        use Step::*;
        match (self, action) {
            (Agency, Next) => Some(AppointmentType),
            (AppointmentType, Next) => Some(Adviser),
            (Adviser, Next) => Some(DateTime),
            (DateTime, Next) => Some(PersonalInfo),
            (PersonalInfo, Next) => Some(Confirmation),

            (AppointmentType, Back) => Some(Agency),
            (Adviser, Back) => Some(AppointmentType),
            (DateTime, Back) => Some(Adviser),
            (PersonalInfo, Back) => Some(DateTime),

            (Confirmation, EditProfile) => Some(PersonalInfo),
            (Confirmation, EditDate) => Some(DateTime),
            (Confirmation, Confirm) => Some(Success),

            (Success, ModifyAppointment) => Some(PhoneVerification),
            (Success, Exit) => Some(Agency),

            (PhoneVerification, VerifyPhone) => Some(ModifyContact),
            (ModifyContact, UpdateContact) => Some(Agency),

            (_, Restart) => Some(Agency),
            _ => None,
        }
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step.number()
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Step::from_number(n).ok_or_else(|| format!("unknown booking step {n}"))
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Agency => "agency",
            Self::AppointmentType => "appointment_type",
            Self::Adviser => "adviser",
            Self::DateTime => "date_time",
            Self::PersonalInfo => "personal_info",
            Self::Confirmation => "confirmation",
            Self::Success => "success",
            Self::PhoneVerification => "phone_verification",
            Self::ModifyContact => "modify_contact",
        };
        write!(f, "{} ({s})", self.number())
    }
}

/// Payload-free action discriminant used by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Next,
    Back,
    EditProfile,
    EditDate,
    Confirm,
    ModifyAppointment,
    Exit,
    VerifyPhone,
    UpdateContact,
    Restart,
}

impl ActionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Back => "back",
            Self::EditProfile => "edit_profile",
            Self::EditDate => "edit_date",
            Self::Confirm => "confirm",
            Self::ModifyAppointment => "modify_appointment",
            Self::Exit => "exit",
            Self::VerifyPhone => "verify_phone",
            Self::UpdateContact => "update_contact",
            Self::Restart => "restart",
        }
    }
}

/// A user action submitted against a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum Action {
    Next(StepInput),
    Back,
    EditProfile,
    EditDate,
    Confirm,
    ModifyAppointment,
    Exit,
    VerifyPhone { phone: String },
    UpdateContact(ContactUpdate),
    Restart,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Next(_) => ActionKind::Next,
            Self::Back => ActionKind::Back,
            Self::EditProfile => ActionKind::EditProfile,
            Self::EditDate => ActionKind::EditDate,
            Self::Confirm => ActionKind::Confirm,
            Self::ModifyAppointment => ActionKind::ModifyAppointment,
            Self::Exit => ActionKind::Exit,
            Self::VerifyPhone { .. } => ActionKind::VerifyPhone,
            Self::UpdateContact(_) => ActionKind::UpdateContact,
            Self::Restart => ActionKind::Restart,
        }
    }
}

/// Result of a successfully applied action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: Step,
    pub to: Step,
    /// User-facing message, if the step produces one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    /// Appointment created by a confirm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Uuid>,
}

impl Transition {
    pub fn new(from: Step, to: Step) -> Self {
        Self {
            from,
            to,
            notice: None,
            created: None,
        }
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }
}
