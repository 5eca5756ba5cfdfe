use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// Capability to exchange JSON with the LMS. Paths are relative to the LMS
/// root, start with `/` and may carry a query string. Bodies that are empty
/// come back as `Value::Null`.
pub trait HttpTransport: Send + Sync {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, anyhow::Result<Value>>;

    fn post_json<'a>(
        &'a self,
        path: &'a str,
        body: &'a Value,
    ) -> BoxFuture<'a, anyhow::Result<Value>>;

    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, anyhow::Result<Value>>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, anyhow::Result<Value>> {
        (**self).get(path)
    }

    fn post_json<'a>(
        &'a self,
        path: &'a str,
        body: &'a Value,
    ) -> BoxFuture<'a, anyhow::Result<Value>> {
        (**self).post_json(path, body)
    }

    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, anyhow::Result<Value>> {
        (**self).delete(path)
    }
}
