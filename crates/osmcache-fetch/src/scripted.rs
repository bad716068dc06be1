//! Scripted in-memory element source for development and testing
//!
//! Responses are keyed by a substring of the query (usually one tag filter,
//! e.g. `"amenity"="school"`), so each category can be scripted on its own.

use async_trait::async_trait;
use osmcache_core::error::NetworkError;
use osmcache_core::ports::ElementSource;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type Reply = Result<String, NetworkError>;

#[derive(Debug, Default)]
struct Script {
    needle: String,
    /// One-shot replies, consumed first
    queued: VecDeque<Reply>,
    /// Reply once the queue is exhausted
    fallback: Option<Reply>,
}

#[derive(Debug, Default)]
struct State {
    scripts: Vec<Script>,
    calls: Vec<String>,
}

/// Element source answering from scripted replies
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    state: Arc<Mutex<State>>,
    delay: Duration,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, to exercise timeouts and cancellation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-call
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn script_mut<'a>(state: &'a mut State, needle: &str) -> &'a mut Script {
        let index = match state.scripts.iter().position(|s| s.needle == needle) {
            Some(i) => i,
            None => {
                state.scripts.push(Script { needle: needle.to_string(), ..Default::default() });
                state.scripts.len() - 1
            }
        };
        &mut state.scripts[index]
    }

    /// Answer every matching query with `body`
    pub fn respond(&self, needle: &str, body: impl Into<String>) -> &Self {
        let mut state = self.lock();
        Self::script_mut(&mut state, needle).fallback = Some(Ok(body.into()));
        self
    }

    /// Fail every matching query with `error`
    pub fn fail(&self, needle: &str, error: NetworkError) -> &Self {
        let mut state = self.lock();
        Self::script_mut(&mut state, needle).fallback = Some(Err(error));
        self
    }

    /// Queue a one-shot reply ahead of the standing one
    pub fn push(&self, needle: &str, reply: Reply) -> &Self {
        let mut state = self.lock();
        Self::script_mut(&mut state, needle).queued.push_back(reply);
        self
    }

    /// Every query received so far, in arrival order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of queries received that contain `needle`
    pub fn call_count(&self, needle: &str) -> usize {
        self.lock().calls.iter().filter(|q| q.contains(needle)).count()
    }

    fn reply_for(&self, query: &str) -> Reply {
        let mut state = self.lock();
        state.calls.push(query.to_string());

        let Some(script) = state.scripts.iter_mut().find(|s| query.contains(&s.needle)) else {
            return Err(NetworkError::Http { status: 404 });
        };
        if let Some(reply) = script.queued.pop_front() {
            return reply;
        }
        script.fallback.clone().unwrap_or(Err(NetworkError::Http { status: 404 }))
    }
}

#[async_trait]
impl ElementSource for ScriptedSource {
    async fn fetch(&self, query: &str) -> Result<String, NetworkError> {
        let reply = self.reply_for(query);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        reply
    }

    fn describe(&self) -> String {
        "scripted element source".to_string()
    }
}

/// Overpass JSON body holding tagged nodes `(id, lon, lat, name)`
pub fn nodes_response(tag: (&str, &str), nodes: &[(i64, f64, f64, Option<&str>)]) -> String {
    let elements: Vec<_> = nodes
        .iter()
        .map(|(id, lon, lat, name)| {
            let mut tags = serde_json::Map::new();
            tags.insert(tag.0.to_string(), json!(tag.1));
            if let Some(name) = name {
                tags.insert("name".to_string(), json!(name));
            }
            json!({"type": "node", "id": id, "lat": lat, "lon": lon, "tags": tags})
        })
        .collect();
    json!({"version": 0.6, "elements": elements}).to_string()
}
