//! Test doubles for the engine's collaborators.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

use cachegate_core::{
    CacheDb, CacheStore, CachedResponse, Error, GenerationTag, NetworkFetch, Request, RequestKey, RequestMode,
    Response, ResponseType, StoreBackend,
};

use crate::strategy::StrategyContext;
use crate::tasks::BackgroundTasks;

pub(crate) fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

pub(crate) fn get(s: &str, mode: RequestMode) -> Request {
    Request::get(url(s), mode)
}

pub(crate) fn response(s: &str, status: u16, response_type: ResponseType, body: &str) -> Response {
    Response {
        url: url(s),
        status,
        response_type,
        headers: vec![("content-type".to_string(), "text/plain".to_string())],
        body: Bytes::copy_from_slice(body.as_bytes()),
    }
}

pub(crate) async fn memory_store(tag: &str) -> (CacheDb, Arc<dyn CacheStore>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let store = db.open_generation(&GenerationTag::from(tag)).await.unwrap().store;
    (db, store)
}

pub(crate) async fn context(network: Arc<ScriptedNetwork>, fallback: &str) -> (CacheDb, StrategyContext) {
    let (db, store) = memory_store("test").await;
    let ctx = StrategyContext {
        store,
        network,
        tasks: BackgroundTasks::new(),
        fallback: get(fallback, RequestMode::NoCors).key(),
    };
    (db, ctx)
}

#[derive(Clone)]
enum Reply {
    Respond(Response),
    Fail,
    Stall(Arc<Notify>, Response),
}

/// Network double answering from a per-URL script and counting calls.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn script(&self, s: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url(s).to_string(), reply);
    }

    pub(crate) fn respond(&self, s: &str, status: u16, response_type: ResponseType, body: &str) {
        self.script(s, Reply::Respond(response(s, status, response_type, body)));
    }

    pub(crate) fn respond_ok(&self, s: &str, body: &str) {
        self.respond(s, 200, ResponseType::Basic, body);
    }

    pub(crate) fn fail(&self, s: &str) {
        self.script(s, Reply::Fail);
    }

    /// Hold the response until the returned handle is notified.
    pub(crate) fn stall(&self, s: &str, body: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script(s, Reply::Stall(gate.clone(), response(s, 200, ResponseType::Basic, body)));
        gate
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, s: &str) -> usize {
        let target = url(s).to_string();
        self.calls.lock().unwrap().iter().filter(|c| **c == target).count()
    }
}

#[async_trait]
impl NetworkFetch for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let target = request.url.to_string();
        self.calls.lock().unwrap().push(target.clone());
        let reply = self.replies.lock().unwrap().get(&target).cloned();

        match reply {
            Some(Reply::Respond(r)) => Ok(r),
            Some(Reply::Stall(gate, r)) => {
                gate.notified().await;
                Ok(r)
            }
            Some(Reply::Fail) => Err(Error::Network(format!("{target}: connection refused"))),
            None => Err(Error::Network(format!("{target}: no route"))),
        }
    }
}

/// Store whose writes always fail.
#[derive(Debug)]
pub(crate) struct ReadOnlyStore {
    pub(crate) inner: Arc<dyn CacheStore>,
}

#[async_trait]
impl CacheStore for ReadOnlyStore {
    fn generation(&self) -> &GenerationTag {
        self.inner.generation()
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        self.inner.lookup(key).await
    }

    async fn put(&self, key: &RequestKey, _response: &Response) -> Result<(), Error> {
        Err(Error::StoreWrite(format!("{key}: disk I/O error")))
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        self.inner.delete(key).await
    }
}
