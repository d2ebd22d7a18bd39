use crate::error::{AppError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `fut` to completion unless `token` is cancelled first.
pub(crate) async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AppError::Cancelled),
        result = fut => result,
    }
}
