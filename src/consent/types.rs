use std::{borrow::Borrow, collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

pub const NECESSARY: &str = "necessary";
pub const ANALYTICS: &str = "analytics";
pub const MARKETING: &str = "marketing";
pub const FUNCTIONAL: &str = "functional";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn necessary() -> Self {
        Self::new(NECESSARY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_necessary(&self) -> bool {
        self.0 == NECESSARY
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CategoryId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CategoryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Category id -> granted. Serializes as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentCategories(BTreeMap<CategoryId, bool>);

impl ConsentCategories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<bool> {
        self.0.get(id).copied()
    }

    pub fn is_granted(&self, id: &str) -> bool {
        self.get(id).unwrap_or(false)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn set(&mut self, id: impl Into<CategoryId>, granted: bool) {
        self.0.insert(id.into(), granted);
    }

    pub fn with(mut self, id: impl Into<CategoryId>, granted: bool) -> Self {
        self.set(id, granted);
        self
    }

    pub fn remove(&mut self, id: &str) -> Option<bool> {
        self.0.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CategoryId, bool)> {
        self.0.iter().map(|(id, granted)| (id, *granted))
    }

    pub fn ids(&self) -> impl Iterator<Item = &CategoryId> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every category other than `necessary` is granted.
    pub fn all_optional_granted(&self) -> bool {
        self.iter()
            .filter(|(id, _)| !id.is_necessary())
            .all(|(_, granted)| granted)
    }
}

impl<K: Into<CategoryId>> FromIterator<(K, bool)> for ConsentCategories {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, granted)| (id.into(), granted)).collect())
    }
}

impl<K: Into<CategoryId>, const N: usize> From<[(K, bool); N]> for ConsentCategories {
    fn from(entries: [(K, bool); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// A consent purpose offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDeclaration {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl CategoryDeclaration {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            required: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Full container state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentState {
    pub has_user_consented: bool,
    pub consent_state: ConsentCategories,
    pub show_banner: bool,
    pub show_settings: bool,
}

impl ConsentState {
    pub fn undecided(consent_state: ConsentCategories) -> Self {
        Self {
            has_user_consented: false,
            consent_state,
            show_banner: true,
            show_settings: false,
        }
    }
}
