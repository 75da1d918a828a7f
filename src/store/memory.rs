//! In-memory `BookingStore` used by the demo binary and the tests.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::booking::model::{
    Adviser, Agency, AppointmentRecord, AppointmentStatus, AppointmentType, ContactUpdate,
    NewAppointment,
};
use crate::error::StoreError;
use crate::hours::WorkingHoursRecord;

use super::traits::BookingStore;

/// Vectors behind async locks. Insertion order is listing order.
#[derive(Default)]
pub struct InMemoryStore {
    agencies: RwLock<Vec<Agency>>,
    advisers: RwLock<Vec<Adviser>>,
    appointment_types: RwLock<Vec<AppointmentType>>,
    appointments: RwLock<Vec<AppointmentRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_agency(&self, agency: Agency) {
        self.agencies.write().await.push(agency);
    }

    pub async fn insert_adviser(&self, adviser: Adviser) {
        self.advisers.write().await.push(adviser);
    }

    pub async fn insert_appointment_type(&self, appointment_type: AppointmentType) {
        self.appointment_types.write().await.push(appointment_type);
    }

    /// Insert an already-identified appointment, bypassing the slot
    /// uniqueness check.
    pub async fn insert_appointment(&self, appointment: AppointmentRecord) {
        self.appointments.write().await.push(appointment);
    }

    /// Two agencies, three advisers and a handful of appointment types.
    pub async fn with_demo_data() -> Self {
        let store = Self::new();

        let casablanca = Agency {
            id: Uuid::new_v4(),
            name: "Casablanca Centre".into(),
            address: Some("12 Boulevard d'Anfa, Casablanca".into()),
            contact: Some("+212 522 000 000".into()),
        };
        let rabat = Agency {
            id: Uuid::new_v4(),
            name: "Rabat Agdal".into(),
            address: Some("4 Avenue de France, Rabat".into()),
            contact: None,
        };

        let weekdays = |start: u16, end: u16| -> Vec<WorkingHoursRecord> {
            (1..=5)
                .map(|day| WorkingHoursRecord::new(day, Some(start), Some(end)))
                .collect()
        };

        store
            .insert_adviser(Adviser {
                id: Uuid::new_v4(),
                name: "Salma Idrissi".into(),
                agency_id: casablanca.id,
                working_hours: weekdays(900, 1700),
                specializations: Some("Mortgages".into()),
            })
            .await;
        store
            .insert_adviser(Adviser {
                id: Uuid::new_v4(),
                name: "Youssef Alaoui".into(),
                agency_id: casablanca.id,
                working_hours: {
                    let mut hours = weekdays(1000, 1800);
                    hours.push(WorkingHoursRecord::new(6, Some(900), Some(1200)));
                    hours
                },
                specializations: None,
            })
            .await;
        store
            .insert_adviser(Adviser {
                id: Uuid::new_v4(),
                name: "Nadia Berrada".into(),
                agency_id: rabat.id,
                working_hours: weekdays(800, 1600),
                specializations: Some("Savings, insurance".into()),
            })
            .await;

        store.insert_agency(casablanca).await;
        store.insert_agency(rabat).await;

        for (name, description) in [
            ("Account opening", "Open a current or savings account."),
            ("Loan consultation", "Discuss a personal or property loan."),
            ("Investment advice", "Review savings and investment options."),
        ] {
            store
                .insert_appointment_type(AppointmentType {
                    id: Uuid::new_v4(),
                    name: name.into(),
                    description: description.into(),
                })
                .await;
        }

        store
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn list_agencies(&self) -> Result<Vec<Agency>, StoreError> {
        Ok(self.agencies.read().await.clone())
    }

    async fn load_agency(&self, id: Uuid) -> Result<Option<Agency>, StoreError> {
        Ok(self.agencies.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn list_advisers_by_agency(&self, agency_id: Uuid) -> Result<Vec<Adviser>, StoreError> {
        Ok(self
            .advisers
            .read()
            .await
            .iter()
            .filter(|a| a.agency_id == agency_id)
            .cloned()
            .collect())
    }

    async fn load_adviser(&self, id: Uuid) -> Result<Option<Adviser>, StoreError> {
        Ok(self.advisers.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn list_appointment_types(&self) -> Result<Vec<AppointmentType>, StoreError> {
        Ok(self.appointment_types.read().await.clone())
    }

    async fn load_appointment_type(&self, id: Uuid) -> Result<Option<AppointmentType>, StoreError> {
        Ok(self
            .appointment_types
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn list_appointments(&self) -> Result<Vec<AppointmentRecord>, StoreError> {
        Ok(self.appointments.read().await.clone())
    }

    async fn find_appointment_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<AppointmentRecord>, StoreError> {
        Ok(self
            .appointments
            .read()
            .await
            .iter()
            .find(|a| a.customer_phone == phone)
            .cloned())
    }

    async fn load_appointment(&self, id: Uuid) -> Result<Option<AppointmentRecord>, StoreError> {
        Ok(self.appointments.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<AppointmentRecord, StoreError> {
        let mut appointments = self.appointments.write().await;

        // One live appointment per adviser and slot.
        let taken = appointments.iter().any(|a| {
            a.adviser_id == appointment.adviser_id
                && a.date == appointment.date
                && a.status != AppointmentStatus::Cancelled
        });
        if taken {
            debug!(
                adviser_id = %appointment.adviser_id,
                date = %appointment.date,
                "Slot already taken"
            );
            return Err(StoreError::Constraint(format!(
                "adviser {} is already booked for {}",
                appointment.adviser_id, appointment.date
            )));
        }

        let record = AppointmentRecord::from_new(Uuid::new_v4(), appointment);
        info!(appointment_id = %record.id, date = %record.date, "Appointment stored");
        appointments.push(record.clone());
        Ok(record)
    }

    async fn update_appointment_contact(
        &self,
        id: Uuid,
        contact: ContactUpdate,
    ) -> Result<(), StoreError> {
        let mut appointments = self.appointments.write().await;
        let record = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "appointment".into(),
                id: id.to_string(),
            })?;
        record.customer_name = contact.customer_name;
        record.customer_email = contact.customer_email;
        record.customer_phone = contact.customer_phone;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_appointment(adviser_id: Uuid, date: &str) -> NewAppointment {
        NewAppointment {
            agency_id: Uuid::new_v4(),
            adviser_id,
            title: "Account opening".into(),
            date: date.into(),
            customer_name: "Amina Benali".into(),
            customer_email: "amina@example.com".into(),
            customer_phone: "0612345678".into(),
            status: AppointmentStatus::Pending,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_lists() {
        let store = InMemoryStore::new();
        let created = store
            .create_appointment(new_appointment(Uuid::new_v4(), "Tuesday, 15 April 2025 : 10:00 - 10:30"))
            .await
            .unwrap();

        let all = store.list_appointments().await.unwrap();
        assert_eq!(all, vec![created.clone()]);
        assert_eq!(store.load_appointment(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn same_adviser_same_slot_is_rejected() {
        let store = InMemoryStore::new();
        let adviser = Uuid::new_v4();
        let slot = "Tuesday, 15 April 2025 : 10:00 - 10:30";
        store.create_appointment(new_appointment(adviser, slot)).await.unwrap();

        let err = store.create_appointment(new_appointment(adviser, slot)).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        // A different adviser may take the same slot.
        store
            .create_appointment(new_appointment(Uuid::new_v4(), slot))
            .await
            .unwrap();
        assert_eq!(store.list_appointments().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn phone_lookup_is_exact() {
        let store = InMemoryStore::new();
        store
            .create_appointment(new_appointment(Uuid::new_v4(), "Tuesday, 15 April 2025 : 10:00 - 10:30"))
            .await
            .unwrap();

        assert!(store.find_appointment_by_phone("0612345678").await.unwrap().is_some());
        assert!(store.find_appointment_by_phone("612345678").await.unwrap().is_none());
        assert!(store.find_appointment_by_phone("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn contact_update_overwrites_fields() {
        let store = InMemoryStore::new();
        let created = store
            .create_appointment(new_appointment(Uuid::new_v4(), "Tuesday, 15 April 2025 : 10:00 - 10:30"))
            .await
            .unwrap();

        let contact = ContactUpdate {
            customer_name: "Amina El Fassi".into(),
            customer_email: "amina.elfassi@example.com".into(),
            customer_phone: "0699999999".into(),
        };
        store.update_appointment_contact(created.id, contact.clone()).await.unwrap();
        let reloaded = store.load_appointment(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.contact(), contact);
        assert_eq!(reloaded.date, created.date);

        let missing = store.update_appointment_contact(Uuid::new_v4(), contact).await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn demo_data_links_advisers_to_agencies() {
        let store = InMemoryStore::with_demo_data().await;
        let agencies = store.list_agencies().await.unwrap();
        assert_eq!(agencies.len(), 2);
        let advisers = store.list_advisers_by_agency(agencies[0].id).await.unwrap();
        assert_eq!(advisers.len(), 2);
        assert!(advisers.iter().all(|a| a.agency_id == agencies[0].id));
        assert_eq!(store.list_appointment_types().await.unwrap().len(), 3);
    }
}
