//! In-process gateway double with scripted replies and a call log

use super::Gateway;
use crate::error::QueryError;
use crate::models::ExecutionResult;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum Reply {
    Success(Value),
    ToolFailure(String),
    Unavailable(String),
}

/// Replies are queued per tool; the last reply repeats once the queue is
/// down to one entry. Unscripted tools are unavailable.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, tool: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(tool.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_tools(&self) -> Vec<String> {
        self.calls().into_iter().map(|(tool, _)| tool).collect()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn invoke(&self, tool: &str, _client_id: &str, params: &Value) -> Result<ExecutionResult> {
        self.calls
            .lock()
            .unwrap()
            .push((tool.to_string(), params.clone()));

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(tool) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Success(data)) => Ok(ExecutionResult::ok(data)),
            Some(Reply::ToolFailure(error)) => Ok(ExecutionResult::failed(error)),
            Some(Reply::Unavailable(error)) => Err(QueryError::GatewayUnavailableError(error)),
            None => Err(QueryError::GatewayUnavailableError(format!(
                "no scripted reply for {}",
                tool
            ))),
        }
    }
}
