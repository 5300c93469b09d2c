//! Reference data: product categories and languages.

use serde::{Deserialize, Serialize};

use stockledger_core::{CategoryId, DocumentId, DomainError, LanguageId};

use crate::codec;
use crate::document_store::{Collection, DocumentStore, Query};
use crate::error::LedgerResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: LanguageId,
    pub name: String,
}

pub async fn add_category<S: DocumentStore + ?Sized>(store: &S, name: &str) -> LedgerResult<Category> {
    let name = required_name("category", name)?;
    let doc = store
        .create(Collection::Category, codec::name_fields(Collection::Category, &name))
        .await?;
    tracing::info!(category_id = %doc.id, %name, "category added");
    Ok(Category { id: doc.id.into(), name })
}

/// All categories, sorted by name.
pub async fn list_categories<S: DocumentStore + ?Sized>(store: &S) -> LedgerResult<Vec<Category>> {
    let mut out = list_names(store, Collection::Category)
        .await?
        .into_iter()
        .map(|(id, name)| Category { id: id.into(), name })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

pub async fn add_language<S: DocumentStore + ?Sized>(store: &S, name: &str) -> LedgerResult<Language> {
    let name = required_name("language", name)?;
    let doc = store
        .create(Collection::Languages, codec::name_fields(Collection::Languages, &name))
        .await?;
    tracing::info!(language_id = %doc.id, %name, "language added");
    Ok(Language { id: doc.id.into(), name })
}

/// All languages, sorted by name.
pub async fn list_languages<S: DocumentStore + ?Sized>(store: &S) -> LedgerResult<Vec<Language>> {
    let mut out = list_names(store, Collection::Languages)
        .await?
        .into_iter()
        .map(|(id, name)| Language { id: id.into(), name })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

fn required_name(what: &str, raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{what} name cannot be empty")));
    }
    Ok(name.to_string())
}

async fn list_names<S: DocumentStore + ?Sized>(
    store: &S,
    collection: Collection,
) -> LedgerResult<Vec<(DocumentId, String)>> {
    let snapshot = store.query(collection, &Query::all()).await?;
    snapshot
        .documents
        .iter()
        .map(|doc| -> LedgerResult<(DocumentId, String)> { Ok((doc.id, codec::decode_name(collection, doc)?)) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::InMemoryDocumentStore;
    use crate::error::LedgerError;

    #[tokio::test]
    async fn categories_are_trimmed_and_sorted() {
        let store = InMemoryDocumentStore::new();
        add_category(&store, " Tools ").await.unwrap();
        add_category(&store, "Books").await.unwrap();

        let names: Vec<_> = list_categories(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Books", "Tools"]);
    }

    #[tokio::test]
    async fn blank_names_are_rejected_before_writing() {
        let store = InMemoryDocumentStore::new();
        assert!(matches!(
            add_language(&store, "   ").await,
            Err(LedgerError::Validation(_))
        ));
        assert!(list_languages(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn languages_round_trip() {
        let store = InMemoryDocumentStore::new();
        let added = add_language(&store, "Deutsch").await.unwrap();
        assert_eq!(list_languages(&store).await.unwrap(), vec![added]);
    }
}
