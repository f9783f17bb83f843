//! Backend commands queued from the shell to the backend worker.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// Restore a previous session if the stored marker is set.
    Initialize,
    Connect,
    Disconnect,
    LoadBalance,
    Transfer {
        to: String,
        amount: String,
    },
    Retry,
    Status,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Initialize => "initialize",
            BackendCommand::Connect => "connect",
            BackendCommand::Disconnect => "disconnect",
            BackendCommand::LoadBalance => "load_balance",
            BackendCommand::Transfer { .. } => "transfer",
            BackendCommand::Retry => "retry",
            BackendCommand::Status => "status",
        }
    }
}
