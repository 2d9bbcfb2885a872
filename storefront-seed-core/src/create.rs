//! Entity and link creators.
//!
//! Each creator turns a typed record into the store's field bag, writes it as a
//! new document under a freshly generated id, and hands back the store's id.
//! Serialization to [`Fields`] happens here and nowhere else.

use serde::Serialize;
use tracing::{debug, error};

use crate::config::CollectionIds;
use crate::contract::{DocumentStore, Fields};
use crate::dataset::{Category, Customization, CustomizationKind, MenuItem};
use crate::error::SeedError;
use crate::seed::SeedStage;

/// Stored shape of a menu item: the source record with its image re-hosted
/// and its category resolved to an id.
#[derive(Debug, Serialize)]
struct MenuItemDocument<'a> {
    name: &'a str,
    description: &'a str,
    image_url: &'a str,
    price: f64,
    rating: f64,
    calories: u32,
    protein: f64,
    categories: &'a str,
    /// Required attribute of the menu collection schema; always 1.
    integer: u32,
}

#[derive(Debug, Serialize)]
struct CustomizationDocument<'a> {
    name: &'a str,
    price: f64,
    #[serde(rename = "type")]
    kind: CustomizationKind,
}

/// Join document between one menu item and one customization.
#[derive(Debug, Serialize)]
struct LinkDocument<'a> {
    menu: &'a str,
    customizations: &'a str,
}

pub async fn create_category<D>(
    store: &D,
    collections: &CollectionIds,
    category: &Category,
) -> Result<String, SeedError>
where
    D: DocumentStore + ?Sized,
{
    create_document(
        store,
        SeedStage::Categories,
        &collections.categories,
        &category.name,
        category,
    )
    .await
}

pub async fn create_customization<D>(
    store: &D,
    collections: &CollectionIds,
    customization: &Customization,
) -> Result<String, SeedError>
where
    D: DocumentStore + ?Sized,
{
    let doc = CustomizationDocument {
        name: &customization.name,
        price: customization.price,
        kind: customization.kind,
    };
    create_document(
        store,
        SeedStage::Customizations,
        &collections.customizations,
        &customization.name,
        &doc,
    )
    .await
}

/// `image_url` must already be the re-hosted view URL, and `category_id` the id
/// created for the item's category in this run.
pub async fn create_menu_item<D>(
    store: &D,
    collections: &CollectionIds,
    item: &MenuItem,
    image_url: &str,
    category_id: &str,
) -> Result<String, SeedError>
where
    D: DocumentStore + ?Sized,
{
    let doc = MenuItemDocument {
        name: &item.name,
        description: &item.description,
        image_url,
        price: item.price,
        rating: item.rating,
        calories: item.calories,
        protein: item.protein,
        categories: category_id,
        integer: 1,
    };
    create_document(
        store,
        SeedStage::MenuItems,
        &collections.menu,
        &item.name,
        &doc,
    )
    .await
}

pub async fn create_link<D>(
    store: &D,
    collections: &CollectionIds,
    menu_id: &str,
    customization_id: &str,
) -> Result<String, SeedError>
where
    D: DocumentStore + ?Sized,
{
    let doc = LinkDocument {
        menu: menu_id,
        customizations: customization_id,
    };
    let label = format!("{menu_id}->{customization_id}");
    create_document(
        store,
        SeedStage::Links,
        &collections.menu_customizations,
        &label,
        &doc,
    )
    .await
}

/// Serializes a record into a field bag.
pub fn to_fields<T: Serialize + ?Sized>(record: &T) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

async fn create_document<D, T>(
    store: &D,
    stage: SeedStage,
    collection: &str,
    name: &str,
    record: &T,
) -> Result<String, SeedError>
where
    D: DocumentStore + ?Sized,
    T: Serialize + ?Sized,
{
    let fields = to_fields(record).map_err(|e| SeedError::Encode {
        collection: collection.to_string(),
        name: name.to_string(),
        source: e,
    })?;
    let id = crate::new_id();
    match store.create_document(collection, &id, fields).await {
        Ok(doc) => {
            debug!(stage = %stage, collection = %collection, name = %name, id = %doc.id, "[SEED] Created document");
            Ok(doc.id)
        }
        Err(e) => {
            error!(
                stage = %stage,
                collection = %collection,
                name = %name,
                error = %e,
                "[SEED][ERROR] Error creating document in collection"
            );
            Err(SeedError::Create {
                stage,
                collection: collection.to_string(),
                name: name.to_string(),
                source: e,
            })
        }
    }
}
