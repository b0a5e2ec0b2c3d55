use std::collections::BTreeSet;

use crate::consent::{
    error::{ConsentError, invalid_catalog, unknown_category},
    types::{
        ANALYTICS, CategoryDeclaration, CategoryId, ConsentCategories, FUNCTIONAL, MARKETING,
        NECESSARY,
    },
};

/// The set of categories a container manages.
///
/// The standard catalog declares the four built-in categories but stays open: ids it does not
/// declare are still accepted, as they are when merged from storage. A catalog built from caller
/// declarations is closed and rejects unknown ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    declarations: Vec<CategoryDeclaration>,
    closed: bool,
}

impl CategoryCatalog {
    pub fn standard() -> Self {
        Self {
            declarations: vec![
                CategoryDeclaration::new(NECESSARY, "Necessary")
                    .with_description("Required for the site to function")
                    .required(),
                CategoryDeclaration::new(ANALYTICS, "Analytics")
                    .with_description("Helps us understand how visitors use the site"),
                CategoryDeclaration::new(MARKETING, "Marketing")
                    .with_description("Used to deliver relevant advertising"),
                CategoryDeclaration::new(FUNCTIONAL, "Functional")
                    .with_description("Remembers preferences and enhanced features"),
            ],
            closed: false,
        }
    }

    pub fn from_declarations(declarations: Vec<CategoryDeclaration>) -> Result<Self, ConsentError> {
        if declarations.is_empty() {
            return Err(invalid_catalog("at least one category must be declared"));
        }
        let mut seen = BTreeSet::new();
        for declaration in &declarations {
            let id = declaration.id.as_str();
            if id.trim().is_empty() {
                return Err(invalid_catalog("category id cannot be empty"));
            }
            if id.trim() != id {
                return Err(invalid_catalog(format!(
                    "category id '{id}' has surrounding whitespace"
                )));
            }
            if !seen.insert(id.to_string()) {
                return Err(invalid_catalog(format!("category '{id}' is declared twice")));
            }
        }

        Ok(Self {
            declarations,
            closed: true,
        })
    }

    pub fn declarations(&self) -> &[CategoryDeclaration] {
        &self.declarations
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn declares(&self, id: &str) -> bool {
        id == NECESSARY || self.declarations.iter().any(|item| item.id.as_str() == id)
    }

    /// Whether `id` may appear in this catalog's consent mapping.
    pub fn accepts(&self, id: &str) -> bool {
        !self.closed || self.declares(id)
    }

    /// `necessary` granted, every other declared category denied.
    pub fn defaults(&self) -> ConsentCategories {
        let mut defaults = ConsentCategories::new().with(CategoryId::necessary(), true);
        for declaration in &self.declarations {
            if !declaration.id.is_necessary() {
                defaults.set(declaration.id.clone(), false);
            }
        }
        defaults
    }

    pub fn validate(&self, categories: &ConsentCategories) -> Result<(), ConsentError> {
        if let Some(unknown) = categories.ids().find(|id| !self.accepts(id.as_str())) {
            return Err(unknown_category(format!(
                "category '{unknown}' is not declared"
            )));
        }
        Ok(())
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
