//! Choosing the active git organization for a resource

use crate::types::{GitOrganization, GitRepository};

/// Derive the organization to preselect.
///
/// A linked repository is authoritative. Otherwise a lone organization is the
/// unambiguous default. Anything else needs an explicit choice.
pub fn select_initial_organization(
    available: &[GitOrganization],
    linked: Option<&GitRepository>,
) -> Option<GitOrganization> {
    if let Some(repository) = linked {
        return Some(repository.organization.clone());
    }
    match available {
        [only] => Some(only.clone()),
        _ => None,
    }
}

/// Current organization plus whether the user picked it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationSelection {
    current: Option<GitOrganization>,
    explicit: bool,
}

impl OrganizationSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&GitOrganization> {
        self.current.as_ref()
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Re-run the derivation after organizations or the link changed.
    ///
    /// An explicit choice is never overwritten, and a derivation that comes
    /// up empty leaves the current selection alone. Returns true when the
    /// selection changed.
    pub fn reconcile(
        &mut self,
        available: &[GitOrganization],
        linked: Option<&GitRepository>,
    ) -> bool {
        if self.explicit {
            return false;
        }
        match select_initial_organization(available, linked) {
            Some(org) if self.current.as_ref() != Some(&org) => {
                self.current = Some(org);
                true
            }
            _ => false,
        }
    }

    /// Record a user choice
    pub fn choose(&mut self, org: GitOrganization) {
        self.current = Some(org);
        self.explicit = true;
    }
}
