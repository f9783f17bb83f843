//! Command orchestration from shell input to the backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued shell->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = format!("Command queue is full; '{cmd_name}' was dropped, please retry");
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend worker stopped (possible startup failure); check the log and restart"
                    .to_string();
        }
    }
}
