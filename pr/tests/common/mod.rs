//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use prompter::{LoadPage, Runner, RunnerError, Store, StoreError, WorkItem};

enum Script {
    /// Pages handed out in order, then done
    Pages(VecDeque<LoadPage>),
    /// Ids `cursor + 1 ..= cursor + limit`, forever
    Endless,
    Failing,
}

/// Store that follows a fixed script and records every call
pub struct ScriptedStore {
    script: Mutex<Script>,
    loads: Mutex<Vec<(Instant, u64, usize)>>,
    saved: Mutex<Vec<(u64, String)>>,
}

impl ScriptedStore {
    fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            loads: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
        })
    }

    pub fn pages(pages: Vec<LoadPage>) -> Arc<Self> {
        Self::with_script(Script::Pages(pages.into()))
    }

    pub fn endless() -> Arc<Self> {
        Self::with_script(Script::Endless)
    }

    pub fn failing() -> Arc<Self> {
        Self::with_script(Script::Failing)
    }

    pub fn loads(&self) -> Vec<(Instant, u64, usize)> {
        self.loads.lock().unwrap().clone()
    }

    pub fn saved(&self) -> Vec<(u64, String)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for ScriptedStore {
    async fn load(&self, cursor: u64, limit: usize) -> Result<LoadPage, StoreError> {
        self.loads.lock().unwrap().push((Instant::now(), cursor, limit));
        match &mut *self.script.lock().unwrap() {
            Script::Pages(pages) => Ok(pages.pop_front().unwrap_or_else(LoadPage::done)),
            Script::Endless => {
                let items = (cursor + 1..=cursor + limit as u64)
                    .map(|id| WorkItem::new(id, "system", format!("prompt {}", id)))
                    .collect();
                Ok(LoadPage::items(items))
            }
            Script::Failing => Err(StoreError::Io(std::io::Error::other("store offline"))),
        }
    }

    async fn save(&self, item: &WorkItem, output: &str) -> Result<(), StoreError> {
        self.saved.lock().unwrap().push((item.id, output.to_string()));
        Ok(())
    }
}

type Behaviour = dyn Fn(&WorkItem, usize) -> Result<String, RunnerError> + Send + Sync;

/// Runner driven by a closure of (item, call number); records when each call started
pub struct RecordingRunner {
    behaviour: Box<Behaviour>,
    latency: Duration,
    calls: Mutex<Vec<(Instant, WorkItem)>>,
}

impl RecordingRunner {
    pub fn new(behaviour: impl Fn(&WorkItem, usize) -> Result<String, RunnerError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            behaviour: Box::new(behaviour),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(|item, _| Ok(format!("output {}", item.id)))
    }

    pub fn with_latency(
        latency: Duration,
        behaviour: impl Fn(&WorkItem, usize) -> Result<String, RunnerError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            behaviour: Box::new(behaviour),
            latency,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(Instant, WorkItem)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.calls.lock().unwrap().iter().map(|(_, item)| item.id).collect()
    }
}

#[async_trait]
impl Runner for RecordingRunner {
    async fn chat(&self, item: &WorkItem, cancel: CancellationToken) -> Result<String, RunnerError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((Instant::now(), item.clone()));
            calls.len() - 1
        };
        if !self.latency.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(RunnerError::Cancelled),
                _ = tokio::time::sleep(self.latency) => {}
            }
        }
        (self.behaviour)(item, n)
    }
}

pub fn api_error(status: u16) -> RunnerError {
    RunnerError::Api {
        status,
        message: format!("status {}", status),
    }
}

pub fn page(ids: std::ops::RangeInclusive<u64>) -> LoadPage {
    LoadPage::items(ids.map(|id| WorkItem::new(id, "system", format!("prompt {}", id))).collect())
}
