use crate::task::TaskId;

/// A registry mutation produced by `update`, published to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Inserted { id: TaskId },
    Replaced { id: TaskId },
    /// Some fields of an existing record were edited locally.
    Patched { id: TaskId },
    Removed { id: TaskId },
}

impl Change {
    pub fn id(&self) -> &str {
        match self {
            Change::Inserted { id }
            | Change::Replaced { id }
            | Change::Patched { id }
            | Change::Removed { id } => id,
        }
    }
}
