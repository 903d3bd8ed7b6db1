use crate::ebook::metadata::PackageMetadata;
use crate::ebook::model::{Collection, CollectionMembership};
use crate::helpers::null_if_empty;
use crate::logger::warn;
use crate::types::CollectionType;

/// Memberships from `belongs-to-collection` metas, in document order.
///
/// Names that collide case-insensitively on their URL slug are the same
/// collection; only the first membership is kept, under the first-seen name.
pub fn resolve_collections(meta: &PackageMetadata) -> Vec<CollectionMembership> {
    let mut memberships: Vec<CollectionMembership> = Vec::new();

    for el in meta.meta_elements("belongs-to-collection") {
        let Some(name) = null_if_empty(Some(&el.text)) else {
            continue;
        };

        let collection = Collection::from_name(&name);
        if collection.url_name.is_empty() {
            warn(&format!("Skipping collection with no URL-safe name: {}", name));
            continue;
        }

        if let Some(existing) = memberships.iter().find(|cm| cm.collection.url_name == collection.url_name) {
            warn(&format!("Collection {} duplicates {}, keeping the first", name, existing.collection.name));
            continue;
        }

        let id = el.id();

        let sequence_number = meta.last_refinement(id, "group-position")
            .and_then(|s| match s.parse::<i32>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn(&format!("Invalid group-position for collection {}: {}", name, s));
                    None
                }
            });

        let collection_type = meta.last_refinement(id, "collection-type")
            .map(|s| CollectionType::from(s.as_str()));

        memberships.push(CollectionMembership {
            collection,
            sequence_number,
            collection_type,
        });
    }

    memberships
}
