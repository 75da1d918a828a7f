//! BookingWorkflow: applies actions to a caller-owned session, validating
//! each step and committing the appointment on confirm.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::availability::{self, BookedEvent, CandidateSelection};
use crate::calendar::{self, CalendarOverlay, CalendarSettings};
use crate::config::BookingConfig;
use crate::error::{FieldError, StoreError, WorkflowError};
use crate::hours::WorkingHoursNormalizer;
use crate::store::BookingStore;
use crate::timezone::{self, DisplaySlot};

use super::model::{
    Adviser, Agency, AppointmentRecord, AppointmentStatus, AppointmentType, ConfirmationSummary,
    ContactUpdate, NewAppointment, PersonalInfo, PersonalInfoForm, SlotSelection, StepInput,
    WorkflowSession,
};
use super::state::{Action, Step, Transition};

pub const CONTACT_UPDATED: &str = "Your information has been updated.";
pub const BOOKING_RECEIVED: &str = "Your appointment request has been received.";

/// What the UI should render for the session's current step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum StepView {
    Agency {
        agencies: Vec<Agency>,
        selected: Option<Uuid>,
    },
    AppointmentType {
        appointment_types: Vec<AppointmentType>,
        selected: Option<Uuid>,
    },
    Adviser {
        advisers: Vec<Adviser>,
        selected: Option<Uuid>,
    },
    DateTime {
        calendar: CalendarOverlay,
        #[serde(skip_serializing_if = "Option::is_none")]
        selected: Option<DisplaySlot>,
    },
    PersonalInfo(PersonalInfoForm),
    Confirmation(ConfirmationSummary),
    Success {
        message: &'static str,
    },
    PhoneVerification,
    ModifyContact {
        appointment_id: Uuid,
        contact: ContactUpdate,
    },
}

/// Drives the booking steps against a [`BookingStore`].
pub struct BookingWorkflow {
    store: Arc<dyn BookingStore>,
    config: BookingConfig,
    normalizer: WorkingHoursNormalizer,
    display_zone: Tz,
}

impl BookingWorkflow {
    pub fn new(store: Arc<dyn BookingStore>, config: BookingConfig) -> Self {
        let display_zone = timezone::resolve_zone(&config.display_time_zone).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to UTC for stored slot strings");
            Tz::UTC
        });
        Self {
            store,
            normalizer: WorkingHoursNormalizer::from_config(&config),
            config,
            display_zone,
        }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Apply one action. On error the session keeps its step and draft,
    /// except where a vanished modify target forces a reset.
    pub async fn apply(
        &self,
        session: &mut WorkflowSession,
        action: Action,
    ) -> Result<Transition, WorkflowError> {
        let from = session.current_step;
        let kind = action.kind();
        let Some(to) = from.transition(kind) else {
            warn!(step = %from, action = kind.name(), "Illegal booking action");
            return Err(WorkflowError::IllegalTransition {
                step: from,
                action: kind.name(),
            });
        };

        let mut transition = Transition::new(from, to);
        match action {
            Action::Next(input) => self.collect(session, input).await?,
            Action::Back | Action::EditProfile | Action::EditDate | Action::ModifyAppointment => {}
            Action::Confirm => {
                let created = self.commit(session).await?;
                transition.created = Some(created.id);
                transition = transition.with_notice(BOOKING_RECEIVED);
            }
            Action::Exit | Action::Restart => session.reset(),
            Action::VerifyPhone { phone } => self.verify_phone(session, &phone).await?,
            Action::UpdateContact(contact) => {
                self.update_contact(session, contact).await?;
                transition = transition.with_notice(CONTACT_UPDATED);
            }
        }

        session.current_step = to;
        info!(from = %from, to = %to, action = kind.name(), "Booking step changed");
        Ok(transition)
    }

    // ── Step input ──────────────────────────────────────────────────

    async fn collect(
        &self,
        session: &mut WorkflowSession,
        input: StepInput,
    ) -> Result<(), WorkflowError> {
        if input.step() != session.current_step {
            return Err(WorkflowError::field(
                "step",
                "Submitted data does not belong to the current step.",
            ));
        }

        let input = match input {
            StepInput::DateTime(selection) => {
                self.select_slot(session, &selection).await?;
                return Ok(());
            }
            other => other,
        };

        let draft = &mut session.draft;
        match input {
            StepInput::Agency { agency_id } => {
                let missing = || WorkflowError::field("agency", "Please select an agency.");
                let id = agency_id.ok_or_else(missing)?;
                self.store.load_agency(id).await?.ok_or_else(missing)?;
                draft.agency_id = Some(id);
            }
            StepInput::AppointmentType { appointment_type_id } => {
                let missing = || {
                    WorkflowError::field("appointment_type", "Please select an appointment type.")
                };
                let id = appointment_type_id.ok_or_else(missing)?;
                self.store.load_appointment_type(id).await?.ok_or_else(missing)?;
                draft.appointment_type_id = Some(id);
            }
            StepInput::Adviser { adviser_id } => {
                let missing = || WorkflowError::field("adviser", "Please select an adviser.");
                let id = adviser_id.ok_or_else(missing)?;
                self.store.load_adviser(id).await?.ok_or_else(missing)?;
                draft.adviser_id = Some(id);
            }
            StepInput::DateTime(_) => {}
            StepInput::PersonalInfo(info) => {
                let info = validate_personal_info(info)?;
                draft.first_name = Some(info.first_name);
                draft.last_name = Some(info.last_name);
                draft.email = Some(info.email);
                draft.phone = Some(info.phone);
                draft.terms_accepted = info.terms_accepted;
            }
        }
        Ok(())
    }

    // ── Calendar callbacks ──────────────────────────────────────────

    /// Validate a calendar selection against the draft's adviser without
    /// touching the session.
    pub async fn check_selection(
        &self,
        session: &WorkflowSession,
        selection: &SlotSelection,
    ) -> Result<CandidateSelection, WorkflowError> {
        if selection.start.trim().is_empty() || selection.end.trim().is_empty() {
            return Err(WorkflowError::field(
                "selected_slot",
                "Please select a valid date and time.",
            ));
        }

        let zone = timezone::resolve_zone(&selection.time_zone)?;
        let candidate = CandidateSelection::new(
            timezone::parse_instant(&selection.start)?,
            timezone::parse_instant(&selection.end)?,
        );

        let adviser = self.draft_adviser(session).await?;
        let hours = self.normalizer.normalize(&adviser.working_hours);
        let booked = self.booked_events().await?;

        availability::check_selection(
            &candidate,
            &zone,
            &hours.business_hours,
            &hours.unavailable,
            &booked,
        )
        .map_err(|rejection| {
            warn!(adviser_id = %adviser.id, %rejection, "Selection rejected");
            WorkflowError::SelectionRejected(rejection)
        })?;
        Ok(candidate)
    }

    /// Validate a selection and store it in the draft. Only the date and
    /// time step may write the slot; the step does not change.
    pub async fn select_slot(
        &self,
        session: &mut WorkflowSession,
        selection: &SlotSelection,
    ) -> Result<DisplaySlot, WorkflowError> {
        if session.current_step != Step::DateTime {
            warn!(step = %session.current_step, "Slot selection outside the date step");
            return Err(WorkflowError::IllegalTransition {
                step: session.current_step,
                action: "select_slot",
            });
        }

        let candidate = self.check_selection(session, selection).await?;
        let zone_id = selection.time_zone.trim().to_string();
        let slot = timezone::to_display(candidate.start, candidate.end, &zone_id)?;

        let draft = &mut session.draft;
        draft.selected_start = Some(candidate.start);
        draft.selected_end = Some(candidate.end);
        draft.client_time_zone = Some(zone_id);
        Ok(slot)
    }

    /// Every stored appointment as a booked event. Not filtered by adviser.
    ///
    /// Slot strings carry no zone, so they are read back in the configured
    /// display zone whatever zone the booking customer wrote them in.
    pub async fn booked_events(&self) -> Result<Vec<BookedEvent>, StoreError> {
        let appointments = self.store.list_appointments().await?;
        Ok(calendar::booked_events(&appointments, &self.display_zone))
    }

    /// Calendar data for the draft's adviser.
    pub async fn calendar_overlay(
        &self,
        session: &WorkflowSession,
    ) -> Result<CalendarOverlay, WorkflowError> {
        let adviser = self.draft_adviser(session).await?;
        let hours = self.normalizer.normalize(&adviser.working_hours);
        let booked = self.booked_events().await?;
        Ok(CalendarOverlay::build(
            &hours,
            &booked,
            selected_range(session),
            CalendarSettings::from_config(&self.config),
        ))
    }

    // ── Views ───────────────────────────────────────────────────────

    /// Build the view for the current step. A modify step whose target
    /// cannot be loaded resets the session.
    pub async fn view(&self, session: &mut WorkflowSession) -> Result<StepView, WorkflowError> {
        let view = match session.current_step {
            Step::Agency => StepView::Agency {
                agencies: self.store.list_agencies().await?,
                selected: session.draft.agency_id,
            },
            Step::AppointmentType => StepView::AppointmentType {
                appointment_types: self.store.list_appointment_types().await?,
                selected: session.draft.appointment_type_id,
            },
            Step::Adviser => StepView::Adviser {
                advisers: match session.draft.agency_id {
                    Some(agency_id) => self.store.list_advisers_by_agency(agency_id).await?,
                    None => Vec::new(),
                },
                selected: session.draft.adviser_id,
            },
            Step::DateTime => StepView::DateTime {
                calendar: self.calendar_overlay(session).await?,
                selected: self.selected_display(session),
            },
            Step::PersonalInfo => StepView::PersonalInfo(self.personal_info_form(session)),
            Step::Confirmation => StepView::Confirmation(self.confirmation_summary(session).await?),
            Step::Success => StepView::Success {
                message: BOOKING_RECEIVED,
            },
            Step::PhoneVerification => StepView::PhoneVerification,
            Step::ModifyContact => {
                let appointment = self.modify_target(session).await?;
                StepView::ModifyContact {
                    appointment_id: appointment.id,
                    contact: appointment.contact(),
                }
            }
        };
        Ok(view)
    }

    fn personal_info_form(&self, session: &WorkflowSession) -> PersonalInfoForm {
        let draft = &session.draft;
        PersonalInfoForm {
            slot: self.selected_display(session),
            first_name: draft.first_name.clone().unwrap_or_default(),
            last_name: draft.last_name.clone().unwrap_or_default(),
            email: draft.email.clone().unwrap_or_default(),
            phone: draft.phone.clone().unwrap_or_default(),
            terms_accepted: draft.terms_accepted,
        }
    }

    /// What the customer is about to confirm.
    pub async fn confirmation_summary(
        &self,
        session: &WorkflowSession,
    ) -> Result<ConfirmationSummary, WorkflowError> {
        let (agency, appointment_type, adviser) = self.load_selection(session).await?;
        let slot = self.selected_display(session).ok_or_else(|| {
            WorkflowError::field("selected_slot", "Please select a valid date and time.")
        })?;
        let draft = &session.draft;

        Ok(ConfirmationSummary {
            agency: agency.name,
            appointment_type: appointment_type.name,
            adviser: adviser.name,
            time: slot.time_range(),
            date: slot.date,
            first_name: draft.first_name.clone().unwrap_or_default(),
            last_name: draft.last_name.clone().unwrap_or_default(),
            email: draft.email.clone().unwrap_or_default(),
            phone: draft.phone.clone().unwrap_or_default(),
        })
    }

    // ── Commit and modification ─────────────────────────────────────

    async fn commit(
        &self,
        session: &mut WorkflowSession,
    ) -> Result<AppointmentRecord, WorkflowError> {
        let (agency, appointment_type, adviser) = self.load_selection(session).await?;
        let draft = &session.draft;

        let (start, end) = selected_range(session).ok_or_else(|| {
            WorkflowError::field("selected_slot", "Please select a valid date and time.")
        })?;
        let zone_id = draft
            .client_time_zone
            .as_deref()
            .unwrap_or(&self.config.display_time_zone);
        let date = timezone::slot_label(start, end, zone_id)?;

        let request = NewAppointment {
            agency_id: agency.id,
            adviser_id: adviser.id,
            title: appointment_type.name,
            date,
            customer_name: draft.customer_name(),
            customer_email: draft.email.clone().unwrap_or_default(),
            customer_phone: draft.phone.clone().unwrap_or_default(),
            status: AppointmentStatus::Pending,
        };

        let created = self.store.create_appointment(request).await.map_err(|e| {
            warn!(
                error = %e,
                adviser_id = %adviser.id,
                "Failed to store appointment, keeping draft"
            );
            WorkflowError::Store(e)
        })?;

        info!(
            appointment_id = %created.id,
            agency = %agency.name,
            adviser = %adviser.name,
            date = %created.date,
            "Appointment booked"
        );
        session.draft.clear();
        Ok(created)
    }

    async fn verify_phone(
        &self,
        session: &mut WorkflowSession,
        phone: &str,
    ) -> Result<(), WorkflowError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(WorkflowError::field("phone", "Please enter your phone number."));
        }

        match self.store.find_appointment_by_phone(phone).await? {
            Some(appointment) => {
                info!(appointment_id = %appointment.id, "Appointment located for modification");
                session.modify_target = Some(appointment.id);
                Ok(())
            }
            None => {
                warn!("No appointment found for submitted phone number");
                Err(WorkflowError::not_found("appointment", phone))
            }
        }
    }

    async fn update_contact(
        &self,
        session: &mut WorkflowSession,
        contact: ContactUpdate,
    ) -> Result<(), WorkflowError> {
        let contact = validate_contact(contact)?;
        let appointment = self.modify_target(session).await?;

        self.store
            .update_appointment_contact(appointment.id, contact)
            .await?;
        info!(appointment_id = %appointment.id, "Appointment contact updated");

        session.reset();
        Ok(())
    }

    // ── Lookups ─────────────────────────────────────────────────────

    /// Load the modify target, resetting the session if it is gone.
    async fn modify_target(
        &self,
        session: &mut WorkflowSession,
    ) -> Result<AppointmentRecord, WorkflowError> {
        let found = match session.modify_target {
            Some(id) => self.store.load_appointment(id).await?,
            None => None,
        };
        match found {
            Some(appointment) => Ok(appointment),
            None => {
                let id = session
                    .modify_target
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "unset".to_string());
                warn!(appointment_id = %id, "Modify target missing, restarting booking");
                session.reset();
                Err(WorkflowError::not_found("appointment", id))
            }
        }
    }

    async fn draft_adviser(&self, session: &WorkflowSession) -> Result<Adviser, WorkflowError> {
        let id = session
            .draft
            .adviser_id
            .ok_or_else(|| WorkflowError::not_found("adviser", "unset"))?;
        self.store
            .load_adviser(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("adviser", id))
    }

    async fn load_selection(
        &self,
        session: &WorkflowSession,
    ) -> Result<(Agency, AppointmentType, Adviser), WorkflowError> {
        let draft = &session.draft;

        let agency_id = draft
            .agency_id
            .ok_or_else(|| WorkflowError::not_found("agency", "unset"))?;
        let agency = self
            .store
            .load_agency(agency_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("agency", agency_id))?;

        let type_id = draft
            .appointment_type_id
            .ok_or_else(|| WorkflowError::not_found("appointment type", "unset"))?;
        let appointment_type = self
            .store
            .load_appointment_type(type_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("appointment type", type_id))?;

        let adviser = self.draft_adviser(session).await?;
        Ok((agency, appointment_type, adviser))
    }

    fn selected_display(&self, session: &WorkflowSession) -> Option<DisplaySlot> {
        let (start, end) = selected_range(session)?;
        let zone = session
            .draft
            .client_time_zone
            .as_deref()
            .and_then(|id| timezone::resolve_zone(id).ok())
            .unwrap_or(self.display_zone);
        Some(timezone::display_in(start, end, &zone))
    }
}

fn selected_range(session: &WorkflowSession) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    Some((session.draft.selected_start?, session.draft.selected_end?))
}

/// Trim the fields and report every problem at once.
fn validate_personal_info(info: PersonalInfo) -> Result<PersonalInfo, WorkflowError> {
    let info = PersonalInfo {
        first_name: info.first_name.trim().to_string(),
        last_name: info.last_name.trim().to_string(),
        email: info.email.trim().to_string(),
        phone: info.phone.trim().to_string(),
        terms_accepted: info.terms_accepted,
    };

    let mut errors = Vec::new();
    if info.first_name.is_empty() {
        errors.push(FieldError::new("first_name", "Please enter your first name."));
    }
    if info.last_name.is_empty() {
        errors.push(FieldError::new("last_name", "Please enter your last name."));
    }
    if !info.email.validate_email() {
        errors.push(FieldError::new("email", "Please enter a valid email address."));
    }
    if info.phone.is_empty() {
        errors.push(FieldError::new("phone", "Please enter your phone number."));
    }
    if !info.terms_accepted {
        errors.push(FieldError::new("terms", "You must accept the terms and conditions."));
    }

    if errors.is_empty() {
        Ok(info)
    } else {
        Err(WorkflowError::Validation(errors))
    }
}

fn validate_contact(contact: ContactUpdate) -> Result<ContactUpdate, WorkflowError> {
    let contact = ContactUpdate {
        customer_name: contact.customer_name.trim().to_string(),
        customer_email: contact.customer_email.trim().to_string(),
        customer_phone: contact.customer_phone.trim().to_string(),
    };

    let mut errors = Vec::new();
    if contact.customer_name.is_empty() {
        errors.push(FieldError::new("customer_name", "Please enter your name."));
    }
    if !contact.customer_email.validate_email() {
        errors.push(FieldError::new("customer_email", "Please enter a valid email address."));
    }
    if contact.customer_phone.is_empty() {
        errors.push(FieldError::new("customer_phone", "Please enter your phone number."));
    }

    if errors.is_empty() {
        Ok(contact)
    } else {
        Err(WorkflowError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::model::BookingDraft;
    use crate::hours::WorkingHoursRecord;
    use crate::store::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        workflow: BookingWorkflow,
        agency: Uuid,
        appointment_type: Uuid,
        adviser: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let agency = Agency {
            id: Uuid::new_v4(),
            name: "Casablanca Centre".into(),
            address: None,
            contact: None,
        };
        let appointment_type = AppointmentType {
            id: Uuid::new_v4(),
            name: "Account opening".into(),
            description: String::new(),
        };
        let adviser = Adviser {
            id: Uuid::new_v4(),
            name: "Salma Idrissi".into(),
            agency_id: agency.id,
            working_hours: vec![WorkingHoursRecord::new(2, Some(900), Some(1700))],
            specializations: None,
        };
        let ids = (agency.id, appointment_type.id, adviser.id);
        store.insert_agency(agency).await;
        store.insert_appointment_type(appointment_type).await;
        store.insert_adviser(adviser).await;

        Fixture {
            workflow: BookingWorkflow::new(store.clone(), BookingConfig::default()),
            store,
            agency: ids.0,
            appointment_type: ids.1,
            adviser: ids.2,
        }
    }

    fn tuesday_slot(start: &str, end: &str) -> SlotSelection {
        SlotSelection {
            start: format!("2025-04-15T{start}:00Z"),
            end: format!("2025-04-15T{end}:00Z"),
            time_zone: "UTC".into(),
        }
    }

    fn at_step(step: Step, draft: BookingDraft) -> WorkflowSession {
        WorkflowSession {
            current_step: step,
            draft,
            modify_target: None,
        }
    }

    #[tokio::test]
    async fn missing_agency_is_a_field_error() {
        let f = fixture().await;
        let mut session = WorkflowSession::new();
        let err = f
            .workflow
            .apply(&mut session, Action::Next(StepInput::Agency { agency_id: None }))
            .await
            .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "agency");
        assert_eq!(session.current_step, Step::Agency);
        assert!(session.draft.is_empty());
    }

    #[tokio::test]
    async fn input_for_another_step_is_refused() {
        let f = fixture().await;
        let mut session = WorkflowSession::new();
        let err = f
            .workflow
            .apply(&mut session, Action::Next(StepInput::Adviser { adviser_id: Some(f.adviser) }))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(session.draft.adviser_id.is_none());
    }

    #[tokio::test]
    async fn personal_info_reports_all_fields() {
        let f = fixture().await;
        let mut session = at_step(Step::PersonalInfo, BookingDraft::default());
        let err = f
            .workflow
            .apply(
                &mut session,
                Action::Next(StepInput::PersonalInfo(PersonalInfo {
                    first_name: "  ".into(),
                    last_name: String::new(),
                    email: "not-an-email".into(),
                    phone: String::new(),
                    terms_accepted: false,
                })),
            )
            .await
            .unwrap_err();

        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, ["first_name", "last_name", "email", "phone", "terms"]);
        assert_eq!(session.current_step, Step::PersonalInfo);
    }

    #[tokio::test]
    async fn selection_outside_hours_is_rejected() {
        let f = fixture().await;
        let session = at_step(
            Step::DateTime,
            BookingDraft {
                adviser_id: Some(f.adviser),
                ..Default::default()
            },
        );
        let err = f
            .workflow
            .check_selection(&session, &tuesday_slot("08:00", "08:30"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::SelectionRejected(_)));

        f.workflow
            .check_selection(&session, &tuesday_slot("09:00", "09:30"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn selection_needs_a_known_zone_and_adviser() {
        let f = fixture().await;
        let mut session = at_step(Step::DateTime, BookingDraft::default());

        let mut slot = tuesday_slot("09:00", "09:30");
        let err = f.workflow.check_selection(&session, &slot).await.unwrap_err();
        assert!(matches!(err, WorkflowError::LookupNotFound { entity: "adviser", .. }));

        session.draft.adviser_id = Some(f.adviser);
        slot.time_zone = "Mars/Olympus".into();
        let err = f.workflow.select_slot(&mut session, &slot).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Timezone(_)));
        assert!(session.draft.selected_start.is_none());
    }

    #[tokio::test]
    async fn unknown_ids_keep_the_step() {
        let f = fixture().await;
        let mut session = at_step(
            Step::Adviser,
            BookingDraft {
                agency_id: Some(f.agency),
                appointment_type_id: Some(f.appointment_type),
                ..Default::default()
            },
        );
        let err = f
            .workflow
            .apply(
                &mut session,
                Action::Next(StepInput::Adviser { adviser_id: Some(Uuid::new_v4()) }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "adviser");
        assert_eq!(session.current_step, Step::Adviser);
        assert!(session.draft.adviser_id.is_none());

        let mut session = WorkflowSession::new();
        let err = f
            .workflow
            .apply(
                &mut session,
                Action::Next(StepInput::Agency { agency_id: Some(Uuid::new_v4()) }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "agency");
        assert!(session.draft.is_empty());
    }

    #[tokio::test]
    async fn slot_is_only_written_on_the_date_step() {
        let f = fixture().await;
        let draft = BookingDraft {
            adviser_id: Some(f.adviser),
            selected_start: timezone::parse_instant("2025-04-15T10:00:00Z").ok(),
            selected_end: timezone::parse_instant("2025-04-15T10:30:00Z").ok(),
            client_time_zone: Some("UTC".into()),
            ..Default::default()
        };
        for step in [Step::PersonalInfo, Step::Confirmation] {
            let mut session = at_step(step, draft.clone());
            let err = f
                .workflow
                .select_slot(&mut session, &tuesday_slot("14:00", "14:30"))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                WorkflowError::IllegalTransition { action: "select_slot", .. }
            ));
            assert_eq!(session.draft, draft);
            assert_eq!(session.current_step, step);
        }
    }

    #[tokio::test]
    async fn select_slot_fills_draft_without_moving() {
        let f = fixture().await;
        let mut session = at_step(
            Step::DateTime,
            BookingDraft {
                adviser_id: Some(f.adviser),
                ..Default::default()
            },
        );
        let slot = f
            .workflow
            .select_slot(&mut session, &tuesday_slot("10:00", "10:30"))
            .await
            .unwrap();
        assert_eq!(slot.label(), "Tuesday, 15 April 2025 : 10:00 - 10:30");
        assert_eq!(session.current_step, Step::DateTime);
        assert_eq!(session.draft.client_time_zone.as_deref(), Some("UTC"));
        assert!(session.draft.selected_end.is_some());
    }

    #[tokio::test]
    async fn confirm_commits_and_clears() {
        let f = fixture().await;
        let mut session = at_step(
            Step::Confirmation,
            BookingDraft {
                agency_id: Some(f.agency),
                appointment_type_id: Some(f.appointment_type),
                adviser_id: Some(f.adviser),
                selected_start: timezone::parse_instant("2025-04-15T10:00:00Z").ok(),
                selected_end: timezone::parse_instant("2025-04-15T10:30:00Z").ok(),
                client_time_zone: Some("UTC".into()),
                first_name: Some("Amina".into()),
                last_name: Some("Benali".into()),
                email: Some("amina@example.com".into()),
                phone: Some("0612345678".into()),
                terms_accepted: true,
            },
        );

        let summary = f.workflow.confirmation_summary(&session).await.unwrap();
        assert_eq!(summary.time, "10:00 - 10:30");
        assert_eq!(summary.adviser, "Salma Idrissi");

        let transition = f.workflow.apply(&mut session, Action::Confirm).await.unwrap();
        assert_eq!(transition.to, Step::Success);
        assert_eq!(transition.notice.as_deref(), Some(BOOKING_RECEIVED));
        assert!(session.draft.is_empty());

        let stored = f.store.list_appointments().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(Some(stored[0].id), transition.created);
        assert_eq!(stored[0].customer_name, "Amina Benali");
        assert_eq!(stored[0].title, "Account opening");
        assert_eq!(stored[0].status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn confirm_with_unknown_agency_keeps_draft() {
        let f = fixture().await;
        let draft = BookingDraft {
            agency_id: Some(Uuid::new_v4()),
            appointment_type_id: Some(f.appointment_type),
            adviser_id: Some(f.adviser),
            ..Default::default()
        };
        let mut session = at_step(Step::Confirmation, draft.clone());
        let err = f.workflow.apply(&mut session, Action::Confirm).await.unwrap_err();
        assert!(matches!(err, WorkflowError::LookupNotFound { entity: "agency", .. }));
        assert_eq!(session.draft, draft);
        assert_eq!(session.current_step, Step::Confirmation);
    }

    #[tokio::test]
    async fn illegal_actions_are_reported() {
        let f = fixture().await;
        let mut session = WorkflowSession::new();
        let err = f.workflow.apply(&mut session, Action::Back).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::IllegalTransition { step: Step::Agency, action: "back" }
        ));
    }

    #[tokio::test]
    async fn modify_view_without_target_resets() {
        let f = fixture().await;
        let mut session = at_step(Step::ModifyContact, BookingDraft::default());
        session.modify_target = Some(Uuid::new_v4());
        let err = f.workflow.view(&mut session).await.unwrap_err();
        assert!(matches!(err, WorkflowError::LookupNotFound { entity: "appointment", .. }));
        assert_eq!(session, WorkflowSession::default());
    }

    #[test]
    fn contact_validation_trims_and_checks_email() {
        let contact = validate_contact(ContactUpdate {
            customer_name: " Amina Benali ".into(),
            customer_email: "amina@example.com".into(),
            customer_phone: " 0612345678".into(),
        })
        .unwrap();
        assert_eq!(contact.customer_name, "Amina Benali");
        assert_eq!(contact.customer_phone, "0612345678");

        let err = validate_contact(ContactUpdate {
            customer_name: "Amina".into(),
            customer_email: "amina.example.com".into(),
            customer_phone: "0612345678".into(),
        })
        .unwrap_err();
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].field, "customer_email");
    }
}
