//! In-memory session store for chunked cover-image uploads.
//!
//! Clients split a base64-encoded image into ordered chunks and send them
//! across separate requests, correlated by an `upload_id`. The store keeps
//! the partial state per upload, serializes concurrent submissions for the
//! same id, and hands back the reassembled payload once every index has
//! arrived. Sessions are process-local; a TTL sweep bounds the memory held
//! by uploads that were abandoned mid-flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Errors from chunk submission.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// A precondition on the chunk parameters failed. No state was mutated.
    #[error("{0}")]
    InvalidChunk(String),

    /// `total_chunks` disagrees with the value fixed by the session's first chunk.
    #[error("total_chunks mismatch: session expects {expected}, request sent {got}")]
    TotalsMismatch { expected: u32, got: u32 },

    /// The distinct-index count matched `total_chunks` but an intermediate
    /// index was absent. Cannot happen under correct single-writer use;
    /// checked anyway so reassembly never produces a gapped payload.
    #[error("upload incomplete: chunk {missing_index} was never received")]
    IncompleteUpload { missing_index: u32 },
}

/// Outcome of a successful chunk submission.
#[derive(Debug)]
pub enum ChunkStatus {
    /// More chunks are still expected for this upload.
    Pending { received: u32, total: u32 },
    /// Every index arrived; `payload` is the in-order concatenation.
    /// The session has already been discarded.
    Complete { payload: String },
}

/// Partial state for one in-flight upload.
struct UploadSession {
    /// Fixed by the first chunk; later submissions must agree.
    total_chunks: u32,
    chunks: HashMap<u32, String>,
    last_touched: Instant,
    /// Set once reassembly has run, so racing submissions that still hold
    /// an `Arc` to this session know to start over.
    completed: bool,
}

impl UploadSession {
    fn new(total_chunks: u32) -> Self {
        Self {
            total_chunks,
            chunks: HashMap::new(),
            last_touched: Instant::now(),
            completed: false,
        }
    }
}

/// Process-local store of in-flight upload sessions.
///
/// The outer map lock is held only to look up or insert a session entry;
/// per-upload mutation happens under the session's own mutex, so chunk
/// submissions for different upload ids proceed independently while
/// submissions for the same id are serialized.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<UploadSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit one chunk for `upload_id`.
    ///
    /// The first chunk for an id creates the session and fixes
    /// `total_chunks`. Resubmitting an index overwrites it (idempotent);
    /// the received count tracks distinct indices only. When the count
    /// reaches the total, chunks are concatenated in ascending index order
    /// and the session is discarded before the result is returned, so an
    /// ingestion failure downstream can never resurrect it.
    pub async fn submit(
        &self,
        upload_id: &str,
        chunk_index: u32,
        total_chunks: u32,
        chunk_data: &str,
    ) -> Result<ChunkStatus, ChunkError> {
        if chunk_data.is_empty() {
            return Err(ChunkError::InvalidChunk(
                "chunk data must not be empty".into(),
            ));
        }
        if total_chunks == 0 {
            return Err(ChunkError::InvalidChunk(
                "total_chunks must be greater than zero".into(),
            ));
        }
        if chunk_index >= total_chunks {
            return Err(ChunkError::InvalidChunk(format!(
                "chunk_index {chunk_index} out of range for {total_chunks} chunks"
            )));
        }

        loop {
            let entry = {
                let mut map = self.sessions.lock().await;
                Arc::clone(
                    map.entry(upload_id.to_string())
                        .or_insert_with(|| Arc::new(Mutex::new(UploadSession::new(total_chunks)))),
                )
            };

            let mut session = entry.lock().await;

            if session.completed {
                // Lost a race against a completing submission for the same
                // id; drop the stale entry and retry against a fresh one.
                drop(session);
                self.remove_entry(upload_id, &entry).await;
                continue;
            }

            if session.total_chunks != total_chunks {
                return Err(ChunkError::TotalsMismatch {
                    expected: session.total_chunks,
                    got: total_chunks,
                });
            }

            session.chunks.insert(chunk_index, chunk_data.to_string());
            session.last_touched = Instant::now();

            let received = session.chunks.len() as u32;
            if received < total_chunks {
                return Ok(ChunkStatus::Pending {
                    received,
                    total: total_chunks,
                });
            }

            // Every distinct index is present: reassemble 0..total in order.
            let mut payload =
                String::with_capacity(session.chunks.values().map(String::len).sum());
            for i in 0..total_chunks {
                match session.chunks.get(&i) {
                    Some(chunk) => payload.push_str(chunk),
                    None => {
                        session.completed = true;
                        drop(session);
                        self.remove_entry(upload_id, &entry).await;
                        return Err(ChunkError::IncompleteUpload { missing_index: i });
                    }
                }
            }

            session.completed = true;
            drop(session);
            self.remove_entry(upload_id, &entry).await;
            return Ok(ChunkStatus::Complete { payload });
        }
    }

    /// Drop sessions that have not seen a chunk within `ttl`.
    ///
    /// Returns the number of sessions evicted. Sessions currently being
    /// mutated are skipped and picked up by a later sweep.
    pub async fn evict_expired(&self, ttl: Duration) -> usize {
        let mut map = self.sessions.lock().await;
        let before = map.len();
        map.retain(|_, entry| match entry.try_lock() {
            Ok(session) => session.last_touched.elapsed() <= ttl,
            Err(_) => true,
        });
        before - map.len()
    }

    /// Number of in-flight sessions (for logging and tests).
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Remove `upload_id` from the map, but only if it still points at
    /// `entry` -- a racing submission may already have replaced it.
    async fn remove_entry(&self, upload_id: &str, entry: &Arc<Mutex<UploadSession>>) {
        let mut map = self.sessions.lock().await;
        if map.get(upload_id).is_some_and(|e| Arc::ptr_eq(e, entry)) {
            map.remove(upload_id);
        }
    }
}

/// Prefix a reassembled payload with a JPEG data-URI header when it does
/// not already carry an image one.
///
/// This is a heuristic fallback inherited from the upload protocol, not
/// content sniffing: clients that strip the data-URI header before
/// chunking are assumed to have sent base64 JPEG.
pub fn ensure_data_uri(payload: String) -> String {
    if payload.starts_with("data:image/") {
        payload
    } else {
        format!("data:image/jpeg;base64,{payload}")
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn reassembles_in_index_order_regardless_of_arrival() {
        let store = SessionStore::new();

        assert_matches!(
            store.submit("u1", 2, 3, "CC").await.unwrap(),
            ChunkStatus::Pending { received: 1, total: 3 }
        );
        assert_matches!(
            store.submit("u1", 0, 3, "AA").await.unwrap(),
            ChunkStatus::Pending { received: 2, total: 3 }
        );

        let status = store.submit("u1", 1, 3, "BB").await.unwrap();
        assert_matches!(status, ChunkStatus::Complete { payload } if payload == "AABBCC");

        // Completion discards the session.
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_resend_does_not_advance_the_count() {
        let store = SessionStore::new();

        store.submit("u1", 0, 3, "AA").await.unwrap();
        let status = store.submit("u1", 0, 3, "AA").await.unwrap();
        assert_matches!(status, ChunkStatus::Pending { received: 1, total: 3 });
    }

    #[tokio::test]
    async fn total_chunks_is_fixed_by_the_first_chunk() {
        let store = SessionStore::new();

        store.submit("u1", 0, 3, "AA").await.unwrap();
        let err = store.submit("u1", 1, 4, "BB").await.unwrap_err();
        assert_matches!(err, ChunkError::TotalsMismatch { expected: 3, got: 4 });

        // The mismatch did not disturb the session.
        let status = store.submit("u1", 1, 3, "BB").await.unwrap();
        assert_matches!(status, ChunkStatus::Pending { received: 2, total: 3 });
    }

    #[tokio::test]
    async fn rejects_bad_parameters_without_creating_state() {
        let store = SessionStore::new();

        assert_matches!(
            store.submit("u1", 0, 3, "").await.unwrap_err(),
            ChunkError::InvalidChunk(_)
        );
        assert_matches!(
            store.submit("u1", 0, 0, "AA").await.unwrap_err(),
            ChunkError::InvalidChunk(_)
        );
        assert_matches!(
            store.submit("u1", 3, 3, "AA").await.unwrap_err(),
            ChunkError::InvalidChunk(_)
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn single_chunk_upload_completes_immediately() {
        let store = SessionStore::new();
        let status = store.submit("u1", 0, 1, "whole").await.unwrap();
        assert_matches!(status, ChunkStatus::Complete { payload } if payload == "whole");
    }

    #[tokio::test]
    async fn distinct_upload_ids_are_independent() {
        let store = SessionStore::new();

        store.submit("a", 0, 2, "a0").await.unwrap();
        store.submit("b", 0, 2, "b0").await.unwrap();
        assert_eq!(store.len().await, 2);

        let status = store.submit("a", 1, 2, "a1").await.unwrap();
        assert_matches!(status, ChunkStatus::Complete { payload } if payload == "a0a1");

        // "b" is still pending.
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn resubmitting_after_completion_starts_a_fresh_session() {
        let store = SessionStore::new();

        store.submit("u1", 0, 1, "done").await.unwrap();
        let status = store.submit("u1", 0, 2, "again").await.unwrap();
        assert_matches!(status, ChunkStatus::Pending { received: 1, total: 2 });
    }

    #[tokio::test]
    async fn eviction_removes_only_idle_sessions() {
        let store = SessionStore::new();

        store.submit("stale", 0, 2, "x").await.unwrap();
        let evicted = store.evict_expired(Duration::ZERO).await;
        assert_eq!(evicted, 1);
        assert!(store.is_empty().await);

        store.submit("fresh", 0, 2, "x").await.unwrap();
        let evicted = store.evict_expired(Duration::from_secs(600)).await;
        assert_eq!(evicted, 0);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn data_uri_prefix_is_injected_only_when_absent() {
        assert_eq!(
            ensure_data_uri("AAAA".into()),
            "data:image/jpeg;base64,AAAA"
        );

        let already = "data:image/png;base64,BBBB".to_string();
        assert_eq!(ensure_data_uri(already.clone()), already);
    }
}
