use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::ProtocolError;

/// Cancellation and deadline signal supplied by the caller of a request.
///
/// Handed unchanged to every outbound connection call. Clones share the same
/// token, so cancelling any clone cancels them all.
#[derive(Clone, Debug)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl CallContext {
    /// No deadline; cancelled only through the token.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Deadline `timeout` from now.
    pub fn with_timeout(cancel: CancellationToken, timeout: Duration) -> Self {
        Self {
            cancel,
            deadline: Some((Instant::now() + timeout, timeout)),
        }
    }

    /// A context nothing else holds a handle to. Useful in tests.
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|(at, _)| at)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` until it completes, the token fires, or the deadline
    /// passes, whichever comes first. Cancellation wins ties.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ProtocolError>
    where
        F: Future<Output = Result<T, ProtocolError>>,
    {
        let expired = async {
            match self.deadline {
                Some((at, _)) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        let timeout = self.deadline.map(|(_, d)| d).unwrap_or_default();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProtocolError::Cancelled),
            _ = expired => Err(ProtocolError::Timeout(timeout)),
            res = fut => res,
        }
    }
}
