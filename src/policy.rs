//! Access policy: one place deciding what each role may do.
//!
//! Handlers describe the request as an `(Action, Resource)` pair and ask
//! `authorize` for a decision instead of comparing role strings inline.

use uuid::Uuid;

use crate::models::{Actor, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read appointments or availability.
    ViewAgenda,
    /// Read professionals and insurance providers.
    ViewDirectory,
    Book,
    Reschedule,
    ChangeStatus,
    /// Move an appointment out of a terminal status.
    OverrideStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// One professional's agenda.
    Agenda { professional_id: Uuid },
    /// Everything in the clinic, e.g. an unfiltered appointment list.
    Clinic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub fn authorize(actor: &Actor, action: Action, resource: &Resource) -> Decision {
    match (actor.role, action) {
        (_, Action::ViewDirectory) => Decision::Allow,
        (Role::Admin, _) => Decision::Allow,
        (_, Action::OverrideStatus) => Decision::Deny("Only administrators can reopen a closed appointment"),
        (Role::FrontDesk, _) => Decision::Allow,
        (Role::Manager, Action::ViewAgenda) => Decision::Allow,
        (Role::Manager, _) => Decision::Deny("Managers have read-only access to agendas"),
        (Role::Professional, _) => own_agenda(actor, resource),
    }
}

fn own_agenda(actor: &Actor, resource: &Resource) -> Decision {
    match (resource, actor.professional_id) {
        (Resource::Agenda { professional_id }, Some(own)) if *professional_id == own => Decision::Allow,
        (_, None) => Decision::Deny("User is not linked to a professional agenda"),
        _ => Decision::Deny("Professionals can only access their own agenda"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, professional_id: Option<Uuid>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            display_name: "test".into(),
            role,
            professional_id,
        }
    }

    #[test]
    fn admin_may_do_everything() {
        let admin = actor(Role::Admin, None);
        let agenda = Resource::Agenda { professional_id: Uuid::new_v4() };
        for action in [
            Action::ViewAgenda,
            Action::Book,
            Action::Reschedule,
            Action::ChangeStatus,
            Action::OverrideStatus,
        ] {
            assert!(authorize(&admin, action, &agenda).is_allowed());
        }
    }

    #[test]
    fn front_desk_manages_any_agenda_but_cannot_override() {
        let desk = actor(Role::FrontDesk, None);
        let agenda = Resource::Agenda { professional_id: Uuid::new_v4() };
        assert!(authorize(&desk, Action::Reschedule, &agenda).is_allowed());
        assert!(authorize(&desk, Action::ViewAgenda, &Resource::Clinic).is_allowed());
        assert!(!authorize(&desk, Action::OverrideStatus, &agenda).is_allowed());
    }

    #[test]
    fn manager_is_read_only() {
        let manager = actor(Role::Manager, None);
        let agenda = Resource::Agenda { professional_id: Uuid::new_v4() };
        assert!(authorize(&manager, Action::ViewAgenda, &Resource::Clinic).is_allowed());
        assert!(!authorize(&manager, Action::Book, &agenda).is_allowed());
        assert!(!authorize(&manager, Action::Reschedule, &agenda).is_allowed());
    }

    #[test]
    fn professional_limited_to_own_agenda() {
        let own = Uuid::new_v4();
        let doctor = actor(Role::Professional, Some(own));
        let mine = Resource::Agenda { professional_id: own };
        let theirs = Resource::Agenda { professional_id: Uuid::new_v4() };

        assert!(authorize(&doctor, Action::ChangeStatus, &mine).is_allowed());
        assert!(!authorize(&doctor, Action::ChangeStatus, &theirs).is_allowed());
        assert!(!authorize(&doctor, Action::ViewAgenda, &Resource::Clinic).is_allowed());
        assert!(!authorize(&doctor, Action::OverrideStatus, &mine).is_allowed());
    }

    #[test]
    fn unlinked_professional_is_denied() {
        let doctor = actor(Role::Professional, None);
        let agenda = Resource::Agenda { professional_id: Uuid::new_v4() };
        assert_eq!(
            authorize(&doctor, Action::ViewAgenda, &agenda),
            Decision::Deny("User is not linked to a professional agenda")
        );
    }

    #[test]
    fn everyone_reads_the_directory() {
        for role in [Role::Admin, Role::FrontDesk, Role::Professional, Role::Manager] {
            assert!(authorize(&actor(role, None), Action::ViewDirectory, &Resource::Clinic).is_allowed());
        }
    }
}
