//! Collection factory.

use std::sync::Arc;

use crate::error::Result;
use crate::traits::StoreCollection;
use crate::types::FirestoreConfig;

#[cfg(feature = "firestore")]
use crate::backends::FirestoreCollection;

/// Creates a [`StoreCollection`] for the given Firestore connection settings.
///
/// The collection is wrapped in `Arc<dyn StoreCollection>` so it can be shared
/// between the store service and the bulk engine.
///
/// # Examples
///
/// ```rust,no_run
/// use store_tracker_remote::{create_collection, FirestoreConfig};
///
/// let mut config = FirestoreConfig::new("my-project");
/// config.id_token = Some("token".to_string());
/// let collection = create_collection(config).unwrap();
/// ```
pub fn create_collection(config: FirestoreConfig) -> Result<Arc<dyn StoreCollection>> {
    #[cfg(feature = "firestore")]
    {
        log::debug!(
            "Creating firestore collection {}/{}",
            config.project_id,
            config.collection_id
        );
        Ok(Arc::new(FirestoreCollection::new(config)?))
    }

    #[cfg(not(feature = "firestore"))]
    {
        let _ = config;
        Err(crate::error::RemoteError::InvalidParameter {
            backend: "none".to_string(),
            param: "backend".to_string(),
            detail: "built without the `firestore` feature".to_string(),
        })
    }
}

#[cfg(all(test, feature = "firestore"))]
mod tests {
    use super::*;

    #[test]
    fn creates_firestore_collection() {
        let collection = create_collection(FirestoreConfig::new("demo")).unwrap();
        assert_eq!(collection.id(), "firestore");
    }
}
