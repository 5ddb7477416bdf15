use std::sync::mpsc::{self, Receiver};

use crate::docker::CancelToken;

/// Install SIGINT/SIGTERM handlers that translate signal delivery into a
/// single cancellation event: the token flips and one unit value lands on
/// the returned channel.
///
/// The handler closes over nothing that is known only after launch; the
/// container handle stays on the main thread, which owns the shutdown
/// sequence once `recv` returns.
pub fn install(cancel: CancelToken) -> Result<Receiver<()>, ctrlc::Error> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        cancel.cancel();
        // A second signal during shutdown just queues another unit; the
        // receiver is read once, so that is harmless.
        let _ = tx.send(());
    })?;
    Ok(rx)
}
