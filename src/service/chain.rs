use async_trait::async_trait;

use super::IlpContext;
use crate::errors::ConnectorError;

/// What the chain driver does after a handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Run the next handler.
    Next,
    /// The request is answered; stop here.
    Done,
}

#[async_trait]
pub trait IlpHandler: Send + Sync {
    async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError>;
}

/// An ordered list of handlers run one after another until one of them
/// answers the request or fails.
#[derive(Default)]
pub struct HandlerChain {
    handlers: Vec<Box<dyn IlpHandler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        HandlerChain {
            handlers: Vec::new(),
        }
    }

    pub fn with<H>(mut self, handler: H) -> Self
    where
        H: IlpHandler + 'static,
    {
        self.handlers.push(Box::new(handler));
        self
    }

    pub async fn run(&self, ctx: &mut IlpContext) -> Result<(), ConnectorError> {
        for handler in self.handlers.iter() {
            if handler.handle(ctx).await? == Outcome::Done {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::fixtures::FULFILL;
    use crate::test_helpers::test_context;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>, Outcome);

    #[async_trait]
    impl IlpHandler for Counting {
        async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if self.1 == Outcome::Done {
                ctx.response.set_fulfill(FULFILL.clone());
            }
            Ok(self.1)
        }
    }

    struct Failing;

    #[async_trait]
    impl IlpHandler for Failing {
        async fn handle(&self, _ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
            Err(ConnectorError::UnknownDestination)
        }
    }

    #[tokio::test]
    async fn stops_at_first_done() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = HandlerChain::new()
            .with(Counting(calls.clone(), Outcome::Next))
            .with(Counting(calls.clone(), Outcome::Done))
            .with(Counting(calls.clone(), Outcome::Next));
        let mut ctx = test_context();
        chain.run(&mut ctx).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(ctx.response.fulfill().is_some());
    }

    #[tokio::test]
    async fn stops_at_first_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = HandlerChain::new()
            .with(Failing)
            .with(Counting(calls.clone(), Outcome::Done));
        let mut ctx = test_context();
        assert!(matches!(
            chain.run(&mut ctx).await,
            Err(ConnectorError::UnknownDestination)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(ctx.response.is_empty());
    }
}
