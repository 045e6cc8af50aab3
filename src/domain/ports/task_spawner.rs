use futures::future::BoxFuture;

/// Seam for starting background workers without naming the runtime.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, future: BoxFuture<'static, ()>);
}
