//! In-process store kept in hash maps, used as a test double.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use super::{AppointmentFilter, AppointmentStore, Directory, StoreError};
use crate::models::{Appointment, InsuranceProvider, Patient, Professional};

#[derive(Default)]
pub struct MemoryStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    professionals: RwLock<HashMap<Uuid, Professional>>,
    patients: RwLock<HashMap<Uuid, Patient>>,
    insurance_providers: RwLock<HashMap<Uuid, InsuranceProvider>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_professional(&self, professional: Professional) -> Result<(), StoreError> {
        self.professionals
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(professional.id, professional);
        Ok(())
    }

    pub fn insert_patient(&self, patient: Patient) -> Result<(), StoreError> {
        self.patients
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(patient.id, patient);
        Ok(())
    }

    pub fn insert_insurance_provider(&self, provider: InsuranceProvider) -> Result<(), StoreError> {
        self.insurance_providers
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(provider.id, provider);
        Ok(())
    }
}

fn filter_matches(filter: &AppointmentFilter, appointment: &Appointment) -> bool {
    filter.professional_id.map_or(true, |id| appointment.professional_id == id)
        && filter.patient_id.map_or(true, |id| appointment.patient_id == Some(id))
        && filter.from.map_or(true, |from| appointment.start >= from)
        && filter.to.map_or(true, |to| appointment.start < to)
        && filter
            .statuses
            .as_ref()
            .map_or(true, |statuses| statuses.contains(&appointment.status))
}

impl AppointmentStore for MemoryStore {
    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.appointments
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let appointments = self.appointments.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(appointments.get(&id).cloned())
    }

    fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut found: Vec<Appointment> = appointments
            .values()
            .filter(|apt| filter_matches(filter, apt))
            .cloned()
            .collect();
        found.sort_by_key(|apt| apt.start);
        Ok(found)
    }

    fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let mut appointments = self.appointments.write().map_err(|_| StoreError::LockPoisoned)?;
        match appointments.get_mut(&appointment.id) {
            Some(stored) => {
                *stored = appointment.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity_type: "appointment",
                id: appointment.id,
            }),
        }
    }
}

impl Directory for MemoryStore {
    fn get_professional(&self, id: Uuid) -> Result<Option<Professional>, StoreError> {
        let professionals = self.professionals.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(professionals.get(&id).cloned())
    }

    fn list_professionals(&self, include_inactive: bool) -> Result<Vec<Professional>, StoreError> {
        let professionals = self.professionals.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut list: Vec<Professional> = professionals
            .values()
            .filter(|p| include_inactive || p.active)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        let patients = self.patients.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(patients.get(&id).cloned())
    }

    fn get_insurance_provider(&self, id: Uuid) -> Result<Option<InsuranceProvider>, StoreError> {
        let providers = self.insurance_providers.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(providers.get(&id).cloned())
    }

    fn list_insurance_providers(&self) -> Result<Vec<InsuranceProvider>, StoreError> {
        let providers = self.insurance_providers.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut list: Vec<InsuranceProvider> = providers.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_timestamp, AppointmentStatus};

    fn booking(professional_id: Uuid, start: &str) -> Appointment {
        let now = parse_timestamp("2024-05-01T08:00").unwrap();
        Appointment::new(professional_id, parse_timestamp(start).unwrap(), 30, now).unwrap()
    }

    #[test]
    fn find_filters_and_orders_by_start() {
        let store = MemoryStore::new();
        let prof = Uuid::new_v4();
        store.insert_appointment(&booking(prof, "2024-06-01T11:00")).unwrap();
        store.insert_appointment(&booking(prof, "2024-06-01T09:00")).unwrap();
        store.insert_appointment(&booking(Uuid::new_v4(), "2024-06-01T10:00")).unwrap();

        let found = store.find_appointments(&AppointmentFilter::for_professional(prof)).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].start < found[1].start);
    }

    #[test]
    fn status_filter_skips_cancelled() {
        let store = MemoryStore::new();
        let prof = Uuid::new_v4();
        let mut cancelled = booking(prof, "2024-06-01T09:00");
        cancelled.status = AppointmentStatus::Cancelled;
        store.insert_appointment(&cancelled).unwrap();
        store.insert_appointment(&booking(prof, "2024-06-01T10:00")).unwrap();

        let filter = AppointmentFilter::for_professional(prof).with_statuses(AppointmentStatus::blocking());
        assert_eq!(store.find_appointments(&filter).unwrap().len(), 1);
    }

    #[test]
    fn update_of_unknown_appointment_fails() {
        let store = MemoryStore::new();
        let result = store.update_appointment(&booking(Uuid::new_v4(), "2024-06-01T09:00"));
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn inactive_professionals_hidden_by_default() {
        let store = MemoryStore::new();
        let mut retired = Professional::new("Dra. Gómez", None).unwrap();
        retired.active = false;
        store.insert_professional(retired).unwrap();
        store.insert_professional(Professional::new("Dr. Pérez", Some("Clínica")).unwrap()).unwrap();

        assert_eq!(store.list_professionals(false).unwrap().len(), 1);
        assert_eq!(store.list_professionals(true).unwrap().len(), 2);
    }
}
