use serde_json::Value;

/// Response keys that identify an asynchronous platform task.
pub const TASK_ID_KEYS: &[&str] = &["jobid", "taskid", "nvl_TaskId"];

/// Status reported by the task endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Started,
    Progress,
    Queued,
    Success,
    Failure,
    /// Anything else the platform reports (`TIMEOUT`, `ABORTED`, ...).
    Other(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "STARTED" => Self::Started,
            "PROGRESS" => Self::Progress,
            "QUEUED" => Self::Queued,
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            other => Self::Other(other.to_string()),
        }
    }

    /// Unknown statuses are terminal so a wait never spins on them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running | Self::Started | Self::Progress | Self::Queued)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Started => "STARTED",
            Self::Progress => "PROGRESS",
            Self::Queued => "QUEUED",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Other(raw) => raw,
        }
    }
}

/// Find the task identifier in a mutating response.
///
/// Looks at the well-known top-level keys first, then at
/// `<task_key>.nvl-activeTask` when the caller names a task key.
pub fn find_task_id(response: &Value, task_key: Option<&str>) -> Option<String> {
    let map = response.as_object()?;
    for key in TASK_ID_KEYS {
        if let Some(id) = map.get(*key).and_then(id_text) {
            return Some(id);
        }
    }
    let task_key = task_key?;
    map.get(task_key)?.get("nvl-activeTask").and_then(id_text)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
