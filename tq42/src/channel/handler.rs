use std::future::Future;

use async_trait::async_trait;

use crate::protocol::{Ask, Tell};

use crate::prelude::*;

/// Computes a [`Tell`] for every [`Ask`] received by a channel session.
///
/// Calls are strictly sequential: the session never invokes the handler again before the
/// previous call has completed. An error aborts the session.
///
/// Implemented for closures returning futures:
///
/// ```rust
/// use tq42::channel::AskHandler;
/// use tq42::protocol::{Ask, Tell};
///
/// fn assert_handler(_: impl AskHandler) {}
///
/// assert_handler(|ask: Ask| async move {
///     let results = vec![0.0; ask.parameters.len()];
///     Ok::<_, std::io::Error>(Tell::for_ask(ask, results))
/// });
/// ```
#[async_trait]
pub trait AskHandler: Send {
    /// Handles a single ask.
    async fn handle(&mut self, ask: Ask) -> std::result::Result<Tell, HandlerError>;
}

#[async_trait]
impl<F, Fut, E> AskHandler for F
where
    F: FnMut(Ask) -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<Tell, E>> + Send + 'static,
    E: Into<HandlerError> + 'static,
{
    async fn handle(&mut self, ask: Ask) -> std::result::Result<Tell, HandlerError> {
        (self)(ask).await.map_err(Into::into)
    }
}
