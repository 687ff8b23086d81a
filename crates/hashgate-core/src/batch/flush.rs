use crate::common::error::Result;

/// The operation a [`Coalescer`](super::Coalescer) runs once per window.
///
/// `flush` receives the complete item list of one window, in submission order.
/// Its result is delivered unchanged to every submitter of that window. The
/// coalescer never runs two flushes of the same instance concurrently.
#[async_trait::async_trait]
pub trait Flush<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn flush(&self, items: Vec<T>) -> Result<()>;
}
