use structa_store::StoreResult;
use tracing::warn;

/// Run a read-only store call, repeating it up to `retries` more times while
/// it fails with a transient error.
pub(crate) fn read_with_retry<T>(
    retries: u32,
    mut call: impl FnMut() -> StoreResult<T>,
) -> StoreResult<T> {
    let mut attempt = 0;
    loop {
        match call() {
            Err(err) if err.is_transient() && attempt < retries => {
                attempt += 1;
                warn!(attempt, error = %err, "transient store error; retrying read");
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;
    use structa_store::StoreError;

    fn transient() -> StoreError {
        StoreError::DeadlineExceeded {
            operation: "get_node",
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn succeeds_after_transient_failure() {
        let calls = Cell::new(0);
        let result = read_with_retry(2, || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(transient())
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn gives_up_after_retries() {
        let calls = Cell::new(0);
        let result: StoreResult<()> = read_with_retry(1, || {
            calls.set(calls.get() + 1);
            Err(transient())
        });
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: StoreResult<()> = read_with_retry(5, || {
            calls.set(calls.get() + 1);
            Err(StoreError::ConnectionLost)
        });
        assert!(matches!(result, Err(StoreError::ConnectionLost)));
        assert_eq!(calls.get(), 1);
    }
}
