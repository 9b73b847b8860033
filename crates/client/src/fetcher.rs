use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use carehub_core::query::{CollectionPage, CollectionQuery};
use carehub_core::resources::Resource;
use serde::de::DeserializeOwned;

use crate::api::ApiClient;
use crate::error::ClientError;

/// Source of paginated collection data.
///
/// Implementations perform one request per call, never retry, and have no
/// side effects beyond the request itself.
#[async_trait]
pub trait CollectionFetcher<T>: Send + Sync {
    async fn fetch(&self, query: &CollectionQuery) -> Result<CollectionPage<T>, ClientError>;
}

/// Fetches a [`Resource`] through the REST API.
pub struct RestCollectionFetcher<T> {
    api: Arc<ApiClient>,
    resource: Resource,
    _item: PhantomData<fn() -> T>,
}

impl<T> RestCollectionFetcher<T> {
    pub fn new(api: Arc<ApiClient>, resource: Resource) -> Self {
        Self {
            api,
            resource,
            _item: PhantomData,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }
}

#[async_trait]
impl<T> CollectionFetcher<T> for RestCollectionFetcher<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, query: &CollectionQuery) -> Result<CollectionPage<T>, ClientError> {
        self.api.list(self.resource, query).await
    }
}
