//! In-memory doubles for the external collaborators, used to drive the
//! pipeline and API without live storage, queue or media services.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use lecture_notes::pipeline::Pipeline;
use lecture_notes::services::fetch::{FetchError, VideoFetcher};
use lecture_notes::services::media::{AudioExtractor, MediaError};
use lecture_notes::services::queue::{Delivery, QueueError, WorkItem, WorkQueue};
use lecture_notes::services::storage::{BlobStore, StorageError};
use lecture_notes::services::summarize::{SummarizeError, Summarizer};
use lecture_notes::services::task_store::TaskStore;
use lecture_notes::services::transcribe::{TranscribeError, Transcriber};

/// Blob store over a HashMap, recording every put in order so tests can
/// assert on the sequence of task-record writes.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: Mutex<Vec<(String, Vec<u8>)>>,
}

impl InMemoryBlobStore {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Every value ever written to `key`, oldest first.
    pub fn put_history(&self, key: &str) -> Vec<Vec<u8>> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), data.to_vec()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://blobs.test/{key}")
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

struct QueuedEntry {
    item: WorkItem,
    receive_count: u32,
}

struct InFlightEntry {
    item: WorkItem,
    receive_count: u32,
    deadline: Instant,
}

/// Work queue with real visibility-timeout semantics, in memory.
pub struct InMemoryQueue {
    pending: Mutex<VecDeque<QueuedEntry>>,
    in_flight: Mutex<HashMap<String, InFlightEntry>>,
    dead_letter: Mutex<Vec<WorkItem>>,
    max_receives: u32,
}

impl InMemoryQueue {
    pub fn new(max_receives: u32) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            in_flight: Mutex::new(HashMap::new()),
            dead_letter: Mutex::new(Vec::new()),
            max_receives,
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    pub fn dead_letter_count(&self) -> usize {
        self.dead_letter.lock().unwrap().len()
    }

    /// Force every in-flight delivery's visibility window to lapse.
    pub fn force_expire(&self) {
        let now = Instant::now();
        for entry in self.in_flight.lock().unwrap().values_mut() {
            entry.deadline = now;
        }
    }

    fn reclaim_expired(&self) {
        let now = Instant::now();
        let mut in_flight = self.in_flight.lock().unwrap();
        let expired: Vec<String> = in_flight
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(entry) = in_flight.remove(&receipt) {
                self.pending.lock().unwrap().push_back(QueuedEntry {
                    item: entry.item,
                    receive_count: entry.receive_count,
                });
            }
        }
    }
}

#[async_trait]
impl WorkQueue for InMemoryQueue {
    async fn enqueue(&self, item: &WorkItem) -> Result<(), QueueError> {
        self.pending.lock().unwrap().push_back(QueuedEntry {
            item: item.clone(),
            receive_count: 0,
        });
        Ok(())
    }

    async fn receive(&self, visibility: Duration) -> Result<Option<Delivery>, QueueError> {
        self.reclaim_expired();

        loop {
            let Some(entry) = self.pending.lock().unwrap().pop_front() else {
                return Ok(None);
            };

            if entry.receive_count >= self.max_receives {
                self.dead_letter.lock().unwrap().push(entry.item);
                continue;
            }

            let receipt = Uuid::new_v4().to_string();
            let receive_count = entry.receive_count + 1;
            self.in_flight.lock().unwrap().insert(
                receipt.clone(),
                InFlightEntry {
                    item: entry.item.clone(),
                    receive_count,
                    deadline: Instant::now() + visibility,
                },
            );

            return Ok(Some(Delivery {
                item: entry.item,
                receipt,
                receive_count,
            }));
        }
    }

    async fn ack(&self, receipt: &str) -> Result<(), QueueError> {
        self.in_flight.lock().unwrap().remove(receipt);
        Ok(())
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        Ok(self.pending.lock().unwrap().len() as u64)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

pub struct StubFetcher {
    pub fail: AtomicBool,
}

impl StubFetcher {
    pub fn ok() -> Self {
        Self {
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl VideoFetcher for StubFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Status(404));
        }
        Ok(b"stub-video-bytes".to_vec())
    }
}

pub struct StubExtractor {
    pub fail_wav: AtomicBool,
    pub duration: Mutex<Option<f64>>,
}

impl StubExtractor {
    pub fn ok() -> Self {
        Self {
            fail_wav: AtomicBool::new(false),
            duration: Mutex::new(Some(90.5)),
        }
    }

    pub fn without_duration() -> Self {
        Self {
            fail_wav: AtomicBool::new(false),
            duration: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AudioExtractor for StubExtractor {
    async fn extract_wav(&self, _video: &[u8]) -> Result<Vec<u8>, MediaError> {
        if self.fail_wav.load(Ordering::SeqCst) {
            return Err(MediaError::Ffmpeg("no audio track".to_string()));
        }
        Ok(b"stub-wav".to_vec())
    }

    async fn extract_mp3(&self, _video: &[u8]) -> Result<Vec<u8>, MediaError> {
        Ok(b"stub-mp3".to_vec())
    }

    async fn probe_duration(&self, _video: &[u8]) -> Option<f64> {
        *self.duration.lock().unwrap()
    }
}

pub struct StubTranscriber {
    /// `None` makes the transcribe call fail.
    pub result: Mutex<Option<String>>,
}

impl StubTranscriber {
    pub fn ok() -> Self {
        Self {
            result: Mutex::new(Some(
                "Welcome to the lecture.\n\nToday we cover supervised learning.".to_string(),
            )),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Mutex::new(None),
        }
    }

    pub fn set_result(&self, text: &str) {
        *self.result.lock().unwrap() = Some(text.to_string());
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio_wav: &[u8]) -> Result<String, TranscribeError> {
        self.result
            .lock()
            .unwrap()
            .clone()
            .ok_or(TranscribeError::NoResult)
    }
}

pub struct StubSummarizer {
    pub fail: AtomicBool,
}

impl StubSummarizer {
    pub fn ok() -> Self {
        Self {
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, _title: &str, _transcript: &str) -> Result<String, SummarizeError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SummarizeError::Empty);
        }
        Ok("Key theses: supervised learning basics.".to_string())
    }
}

/// Everything a pipeline test needs, wired over in-memory collaborators.
pub struct TestHarness {
    pub pipeline: Pipeline,
    pub store: TaskStore,
    pub blobs: Arc<InMemoryBlobStore>,
    pub queue: Arc<InMemoryQueue>,
    pub fetcher: Arc<StubFetcher>,
    pub extractor: Arc<StubExtractor>,
    pub transcriber: Arc<StubTranscriber>,
    pub summarizer: Arc<StubSummarizer>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(
            StubFetcher::ok(),
            StubExtractor::ok(),
            StubTranscriber::ok(),
            StubSummarizer::ok(),
        )
    }

    pub fn build(
        fetcher: StubFetcher,
        extractor: StubExtractor,
        transcriber: StubTranscriber,
        summarizer: StubSummarizer,
    ) -> Self {
        let blobs = Arc::new(InMemoryBlobStore::default());
        let queue = Arc::new(InMemoryQueue::new(3));
        let fetcher = Arc::new(fetcher);
        let extractor = Arc::new(extractor);
        let transcriber = Arc::new(transcriber);
        let summarizer = Arc::new(summarizer);
        let store = TaskStore::new(blobs.clone());

        let pipeline = Pipeline::new(
            store.clone(),
            blobs.clone(),
            queue.clone(),
            fetcher.clone(),
            extractor.clone(),
            transcriber.clone(),
            summarizer.clone(),
        );

        Self {
            pipeline,
            store,
            blobs,
            queue,
            fetcher,
            extractor,
            transcriber,
            summarizer,
        }
    }
}
