use tokio_util::sync::CancellationToken;

/// Cooperative cancellation flag for one background activity.
///
/// A fresh flag is raised for every start. The activity polls `is_running`
/// at the top of each iteration; async bodies can also await `stopped`.
/// Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct RunningFlag {
    token: CancellationToken,
}

impl RunningFlag {
    pub fn raised() -> RunningFlag {
        RunningFlag {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn lower(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves once the flag has been lowered.
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }
}
