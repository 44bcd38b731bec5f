use super::{Kind, Object};
use crate::error::FetchError;
use std::future::Future;

/// Read access to the cluster API.
///
/// Implementations surface every I/O failure as a [`FetchError`] and
/// never retry on their own.
pub trait Fetcher: Sync {
    /// List every object of `kind` visible to the fetcher.
    fn list(&self, kind: Kind) -> impl Future<Output = Result<Vec<Object>, FetchError>> + Send;

    /// Fetch a single object; `Ok(None)` when it does not exist.
    fn get(
        &self,
        kind: Kind,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<Object>, FetchError>> + Send;
}
