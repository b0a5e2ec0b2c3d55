use std::sync::Arc;

use crate::{
    consent::{
        catalog::CategoryCatalog,
        container::{ConsentContainer, ConsentOptions},
        error::ConsentError,
        types::CategoryDeclaration,
    },
    storage::SafeStorage,
};

/// Builds containers over a caller-declared category taxonomy.
///
/// The declarations are validated once; every container created afterwards shares the catalog but
/// owns its own state and storage key.
#[derive(Debug, Clone)]
pub struct ConsentFactory {
    catalog: Arc<CategoryCatalog>,
}

impl ConsentFactory {
    pub fn new(declarations: Vec<CategoryDeclaration>) -> Result<Self, ConsentError> {
        let catalog = CategoryCatalog::from_declarations(declarations)?;
        tracing::debug!(
            target: "consent",
            categories = catalog.declarations().len(),
            "consent_factory_created"
        );
        Ok(Self {
            catalog: Arc::new(catalog),
        })
    }

    pub fn standard() -> Self {
        Self {
            catalog: Arc::new(CategoryCatalog::standard()),
        }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn create(
        &self,
        storage: SafeStorage,
        options: ConsentOptions,
    ) -> Result<ConsentContainer, ConsentError> {
        ConsentContainer::with_catalog(storage, Arc::clone(&self.catalog), options)
    }
}
