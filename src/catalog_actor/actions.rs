use crate::domain::ExternalProductId;

/// Custom actions for catalog items.
#[derive(Debug, Clone)]
pub enum CatalogAction {
    /// Records the id the gateway assigned when the item was published.
    ///
    /// # Errors
    /// Fails if a different external id is already assigned.
    AssignExternalId(ExternalProductId),
}

/// Results from CatalogActions - variants match 1:1 with CatalogAction
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogActionResult {
    AssignExternalId(ExternalProductId),
}
