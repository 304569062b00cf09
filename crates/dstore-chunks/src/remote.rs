//! Transport-fronted chunk store.
//!
//! [`RemoteChunkStore`] implements the synchronous [`ChunkStore`] capability
//! by sending [`ChunkMessage`]s over an async [`ChunkTransport`]. On the other
//! end a [`ChunkServer`] answers them from any local store.
//! [`LoopbackTransport`] connects the two in-process through the real wire
//! codec.

use async_trait::async_trait;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use dstore_types::Ref;

use crate::chunk::Chunk;
use crate::codec::{ChunkCodec, ChunkMessage};
use crate::error::{ChunkError, ChunkResult};
use crate::traits::ChunkStore;

/// Transport interface for a remote chunk store.
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// Send one request and wait for its response.
    async fn send(&self, request: ChunkMessage) -> ChunkResult<ChunkMessage>;
}

/// A [`ChunkStore`] whose every operation is a round-trip over a transport.
///
/// The store owns a small tokio runtime and blocks on it for each call, so
/// it must not be used from inside another async runtime's worker.
pub struct RemoteChunkStore<T> {
    transport: T,
    runtime: Runtime,
}

impl<T: ChunkTransport> RemoteChunkStore<T> {
    pub fn new(transport: T) -> ChunkResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("dstore-remote")
            .enable_all()
            .build()?;
        debug!("remote chunk store started");
        Ok(Self { transport, runtime })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn call(&self, request: ChunkMessage) -> ChunkResult<ChunkMessage> {
        let response = self.runtime.block_on(self.transport.send(request))?;
        if let ChunkMessage::Error { message } = response {
            return Err(ChunkError::Unavailable(format!("remote error: {message}")));
        }
        if response.is_request() {
            return Err(unexpected("a response", &response));
        }
        Ok(response)
    }
}

fn unexpected(expected: &str, got: &ChunkMessage) -> ChunkError {
    ChunkError::Unavailable(format!("expected {expected}, got {}", got.type_name()))
}

impl<T: ChunkTransport> ChunkStore for RemoteChunkStore<T> {
    fn get(&self, id: &Ref) -> ChunkResult<Option<Chunk>> {
        match self.call(ChunkMessage::GetRequest { id: *id })? {
            ChunkMessage::ChunkResponse { chunk: Some(chunk) } => {
                let computed = chunk.compute_ref();
                if computed != *id {
                    return Err(ChunkError::Corrupt {
                        id: *id,
                        reason: format!("remote returned chunk hashing to {computed}"),
                    });
                }
                Ok(Some(chunk))
            }
            ChunkMessage::ChunkResponse { chunk: None } => Ok(None),
            other => Err(unexpected("ChunkResponse", &other)),
        }
    }

    fn has(&self, id: &Ref) -> ChunkResult<bool> {
        match self.call(ChunkMessage::HasRequest { id: *id })? {
            ChunkMessage::HasResponse { present } => Ok(present),
            other => Err(unexpected("HasResponse", &other)),
        }
    }

    fn put(&self, chunk: &Chunk) -> ChunkResult<Ref> {
        let expected = chunk.compute_ref();
        match self.call(ChunkMessage::PutRequest {
            chunk: chunk.clone(),
        })? {
            ChunkMessage::PutResponse { id } if id == expected => Ok(id),
            ChunkMessage::PutResponse { id } => Err(ChunkError::Corrupt {
                id: expected,
                reason: format!("remote stored chunk as {id}"),
            }),
            other => Err(unexpected("PutResponse", &other)),
        }
    }

    fn root(&self) -> ChunkResult<Ref> {
        match self.call(ChunkMessage::RootRequest)? {
            ChunkMessage::RootResponse { root } => Ok(root),
            other => Err(unexpected("RootResponse", &other)),
        }
    }

    fn update_root(&self, current: Ref, last: Ref) -> ChunkResult<bool> {
        match self.call(ChunkMessage::UpdateRootRequest { current, last })? {
            ChunkMessage::UpdateRootResponse { swapped } => Ok(swapped),
            other => Err(unexpected("UpdateRootResponse", &other)),
        }
    }
}

impl<T> std::fmt::Debug for RemoteChunkStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteChunkStore").finish_non_exhaustive()
    }
}

/// Answers [`ChunkMessage`] requests from a local store.
#[derive(Debug)]
pub struct ChunkServer<S> {
    store: S,
}

impl<S: ChunkStore> ChunkServer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle one request. Store failures become [`ChunkMessage::Error`].
    pub fn handle(&self, request: ChunkMessage) -> ChunkMessage {
        let result = match request {
            ChunkMessage::GetRequest { id } => self
                .store
                .get(&id)
                .map(|chunk| ChunkMessage::ChunkResponse { chunk }),
            ChunkMessage::HasRequest { id } => self
                .store
                .has(&id)
                .map(|present| ChunkMessage::HasResponse { present }),
            ChunkMessage::PutRequest { chunk } => self
                .store
                .put(&chunk)
                .map(|id| ChunkMessage::PutResponse { id }),
            ChunkMessage::RootRequest => self
                .store
                .root()
                .map(|root| ChunkMessage::RootResponse { root }),
            ChunkMessage::UpdateRootRequest { current, last } => self
                .store
                .update_root(current, last)
                .map(|swapped| ChunkMessage::UpdateRootResponse { swapped }),
            other => {
                return ChunkMessage::Error {
                    message: format!("not a request: {}", other.type_name()),
                }
            }
        };
        result.unwrap_or_else(|e| ChunkMessage::Error {
            message: e.to_string(),
        })
    }
}

/// In-process transport that pushes every message through the wire codec.
#[derive(Debug)]
pub struct LoopbackTransport<S> {
    server: ChunkServer<S>,
}

impl<S: ChunkStore> LoopbackTransport<S> {
    pub fn new(store: S) -> Self {
        Self {
            server: ChunkServer::new(store),
        }
    }

    pub fn server(&self) -> &ChunkServer<S> {
        &self.server
    }
}

#[async_trait]
impl<S: ChunkStore> ChunkTransport for LoopbackTransport<S> {
    async fn send(&self, request: ChunkMessage) -> ChunkResult<ChunkMessage> {
        let frame = ChunkCodec::encode(&request)?;
        let (received, _) = ChunkCodec::decode(&frame)?;
        let response = self.server.handle(received);
        let frame = ChunkCodec::encode(&response)?;
        let (decoded, _) = ChunkCodec::decode(&frame)?;
        Ok(decoded)
    }
}
