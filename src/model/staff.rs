//! Staff assignments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A reference to a staff member, pre-resolved by the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRef {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StaffRef {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// A set of staff references, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<StaffRef>", into = "Vec<StaffRef>")]
pub struct StaffSet(BTreeMap<String, StaffRef>);

impl StaffSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StaffRef> {
        self.0.values()
    }

    /// Add a reference. An existing entry is kept; a missing name is filled in.
    pub fn insert(&mut self, staff: StaffRef) {
        let id = staff.id.trim();
        if id.is_empty() {
            return;
        }
        let entry = self.0.entry(id.to_string()).or_insert_with(|| StaffRef {
            id: id.to_string(),
            name: None,
        });
        if entry.name.is_none() {
            entry.name = staff.name;
        }
    }

    /// Set union. Never removes anyone already present.
    pub fn union<'a>(&mut self, incoming: impl IntoIterator<Item = &'a StaffRef>) {
        for staff in incoming {
            self.insert(staff.clone());
        }
    }
}

impl From<Vec<StaffRef>> for StaffSet {
    fn from(refs: Vec<StaffRef>) -> Self {
        let mut set = Self::default();
        for staff in refs {
            set.insert(staff);
        }
        set
    }
}

impl From<StaffSet> for Vec<StaffRef> {
    fn from(set: StaffSet) -> Self {
        set.0.into_values().collect()
    }
}
