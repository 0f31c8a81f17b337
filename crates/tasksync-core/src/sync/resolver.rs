//! Tie-break for client and server versions with identical `updated_at`

use crate::models::{Operation, Task};

/// Outcome of a tie-break
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The client's version should be persisted
    Client(Task),
    /// The server keeps its current version
    Server,
}

/// Operation-priority tie-break
///
/// Each operation kind has a fixed priority (`delete > update > create`).
/// The server's effective operation is inferred from its state: a tombstone
/// counts as a delete, anything else as an update. The client only wins with
/// a strictly higher priority, so a delete beats a concurrent update and a
/// tombstone is never resurrected by a same-instant edit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    /// Operation the server's current state stands for
    pub const fn server_operation(server_task: &Task) -> Operation {
        if server_task.is_deleted {
            Operation::Delete
        } else {
            Operation::Update
        }
    }

    /// Decide between `client_task` and `server_task` for a timestamp tie
    pub fn resolve(client_op: Operation, client_task: Task, server_task: &Task) -> Resolution {
        let server_op = Self::server_operation(server_task);
        if client_op.priority() > server_op.priority() {
            tracing::debug!(
                id = %server_task.id,
                client_op = %client_op,
                server_op = %server_op,
                "Tie resolved in favor of client"
            );
            Resolution::Client(client_task)
        } else {
            tracing::debug!(
                id = %server_task.id,
                client_op = %client_op,
                server_op = %server_op,
                "Tie resolved in favor of server"
            );
            Resolution::Server
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(is_deleted: bool) -> Task {
        let mut task = Task::new("c1", "server");
        task.is_deleted = is_deleted;
        task
    }

    fn client() -> Task {
        Task::new("c1", "client")
    }

    #[test]
    fn delete_beats_live_server() {
        let resolution = ConflictResolver::resolve(Operation::Delete, client(), &server(false));
        assert!(matches!(resolution, Resolution::Client(task) if task.title == "client"));
    }

    #[test]
    fn update_loses_to_live_server() {
        let resolution = ConflictResolver::resolve(Operation::Update, client(), &server(false));
        assert_eq!(resolution, Resolution::Server);
    }

    #[test]
    fn create_loses_to_live_server() {
        let resolution = ConflictResolver::resolve(Operation::Create, client(), &server(false));
        assert_eq!(resolution, Resolution::Server);
    }

    #[test]
    fn nothing_beats_tombstone() {
        for op in [Operation::Create, Operation::Update, Operation::Delete] {
            let resolution = ConflictResolver::resolve(op, client(), &server(true));
            assert_eq!(resolution, Resolution::Server, "{op} should lose");
        }
    }

    #[test]
    fn server_operation_follows_tombstone_flag() {
        assert_eq!(
            ConflictResolver::server_operation(&server(true)),
            Operation::Delete
        );
        assert_eq!(
            ConflictResolver::server_operation(&server(false)),
            Operation::Update
        );
    }
}
