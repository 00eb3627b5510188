use std::time::Duration;

use beehive_types::TaskStatus;
use reqwest::Method;
use serde_json::Value;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info};

use crate::{ApiClient, ApiError, CallOptions};

impl ApiClient {
    /// Poll the task endpoint until `task_id` reaches a terminal status.
    ///
    /// Returns the final task record on `SUCCESS`. Any other terminal status,
    /// including ones the client does not know, is a [`ApiError::TaskFailure`].
    /// Polling stops with [`ApiError::TaskTimeout`] once `max_time` has
    /// elapsed; the task itself is left running on the platform. A status
    /// request never outlives the remaining budget by more than one poll
    /// interval.
    pub async fn wait_task(&self, task_id: &str, max_time: Duration, poll_interval: Duration) -> Result<Value, ApiError> {
        let started = Instant::now();
        let path = self.environment().task_path(task_id);
        let mut last_status = "UNKNOWN".to_string();
        loop {
            let budget = max_time.saturating_sub(started.elapsed()).max(poll_interval);
            let options = CallOptions::new().no_wait().timeout(budget + poll_interval);
            let reply = match timeout(budget, self.call(&path, Method::GET, None, &options)).await {
                Ok(reply) => reply?,
                Err(_) => {
                    return Err(ApiError::TaskTimeout {
                        task_id: task_id.to_string(),
                        last_status,
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            };
            let task = reply.get("task").unwrap_or(&reply);
            let Some(raw_status) = task.get("status").and_then(Value::as_str) else {
                return Err(ApiError::TaskFailure {
                    task_id: task_id.to_string(),
                    status: "UNKNOWN".to_string(),
                    message: "task reply carries no status".to_string(),
                });
            };
            let status = TaskStatus::parse(raw_status);
            last_status = status.as_str().to_string();
            if status.is_success() {
                info!(task_id, elapsed_ms = started.elapsed().as_millis() as u64, "task finished");
                return Ok(task.clone());
            }
            if status.is_terminal() {
                return Err(ApiError::TaskFailure {
                    task_id: task_id.to_string(),
                    status: status.as_str().to_string(),
                    message: failure_message(task),
                });
            }

            let elapsed = started.elapsed();
            if elapsed >= max_time {
                return Err(ApiError::TaskTimeout {
                    task_id: task_id.to_string(),
                    last_status: status.as_str().to_string(),
                    waited_secs: elapsed.as_secs(),
                });
            }
            debug!(task_id, status = status.as_str(), "task still running");
            sleep(poll_interval.min(max_time - elapsed)).await;
        }
    }
}

fn failure_message(task: &Value) -> String {
    let text = |value: &Value| match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(map) => map.get("message").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };
    task.get("error")
        .and_then(text)
        .or_else(|| task.get("message").and_then(text))
        .unwrap_or_else(|| "task failed without a message".to_string())
}
