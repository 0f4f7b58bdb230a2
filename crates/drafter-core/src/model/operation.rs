use serde::{Deserialize, Serialize};

/// Mutation kinds a draftable entity supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Create,
    Update,
    Destroy,
}

impl OperationType {
    pub const ALL: [OperationType; 3] = [
        OperationType::Create,
        OperationType::Update,
        OperationType::Destroy,
    ];

    /// Stable storage/log name
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Destroy => "destroy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(OperationType::Create),
            "update" => Some(OperationType::Update),
            "destroy" => Some(OperationType::Destroy),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
