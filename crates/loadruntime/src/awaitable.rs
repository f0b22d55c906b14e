use crate::host::{ChildHandle, HostFuture, WorkflowHost};
use loadcore::{ActionError, Choice};
use tokio_util::sync::CancellationToken;

/// A started unit of work together with the scope that can cancel it.
pub struct Awaitable<T> {
    scope: CancellationToken,
    completion: HostFuture<T>,
}

impl<T: 'static> Awaitable<T> {
    pub fn new(scope: CancellationToken, completion: HostFuture<T>) -> Self {
        Self { scope, completion }
    }

    /// Apply `choice` to the unit. Returns once the policy is satisfied;
    /// the unit's own value is never surfaced.
    pub async fn drive<H>(self, host: &H, choice: Choice) -> Result<(), ActionError>
    where
        H: WorkflowHost + ?Sized,
    {
        let Awaitable { scope, completion } = self;

        match choice {
            Choice::Abandon => {
                tracing::debug!("Abandoning awaitable");
                Ok(())
            }
            Choice::CancelBeforeStarted => {
                scope.cancel();
                swallow_cancellation(completion.await)
            }
            Choice::CancelAfterStarted => {
                host.next_tick().await;
                scope.cancel();
                swallow_cancellation(completion.await)
            }
            Choice::CancelAfterCompleted => {
                let result = swallow_cancellation(completion.await);
                scope.cancel();
                result
            }
            Choice::WaitFinish => completion.await.map(|_| ()),
        }
    }
}

/// Child workflows distinguish "started" from "finished", so the
/// cancel-after-started policy can act on the first milestone.
pub struct ChildAwaitable {
    scope: CancellationToken,
    handle: ChildHandle,
}

impl ChildAwaitable {
    pub fn new(scope: CancellationToken, handle: ChildHandle) -> Self {
        Self { scope, handle }
    }

    pub async fn drive<H>(self, host: &H, choice: Choice) -> Result<(), ActionError>
    where
        H: WorkflowHost + ?Sized,
    {
        let ChildAwaitable { scope, handle } = self;

        match choice {
            Choice::CancelAfterStarted => {
                // A child that never started has nothing to cancel.
                if let Err(e) = handle.started.await {
                    return swallow_cancellation::<()>(Err(e));
                }
                scope.cancel();
                swallow_cancellation(handle.result.await)
            }
            other => Awaitable::new(scope, handle.result).drive(host, other).await,
        }
    }
}

fn swallow_cancellation<T>(result: Result<T, ActionError>) -> Result<(), ActionError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.is_cancellation() => {
            tracing::debug!("Awaitable ended in cancellation");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
