//! Parallel task dispatcher
//!
//! Large tabular computations (per-site genotype statistics) are sharded into
//! chunks and pushed through a bounded worker pool. Each submission returns a
//! [`TaskHandle`]; calling [`TaskHandle::get`] blocks until that chunk has been
//! processed. The dispatcher never reorders or merges results: callers that need
//! a deterministic table sort the collected rows by their own key.
//!
//! The per-chunk computation is a plain `fn` pointer, so it cannot capture any
//! state. Workers receive owned chunks and share nothing mutable.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use itertools::Itertools;
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::engines::{EngineError, EngineResult};

// Default minimum chunks per worker
const MIN_CHUNKS_PER_WORKER: usize = 4;

/// Get the default number of workers to use
pub fn default_num_workers() -> usize {
    num_cpus::get()
}

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Number of concurrently running workers
    pub num_workers: usize,
    /// Prefix for worker thread names
    pub thread_name_prefix: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            thread_name_prefix: "biokit-worker".to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Set the number of workers
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }
}

/// A task result tagged with the submission index of its chunk
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult<R> {
    /// Zero-based submission index
    pub chunk: usize,
    /// Value returned by the task function
    pub value: R,
}

struct ResultSlot<R> {
    value: Mutex<Option<Result<R, String>>>,
    ready: Condvar,
}

impl<R> ResultSlot<R> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn fill(&self, result: Result<R, String>) {
        let mut guard = self.value.lock();
        *guard = Some(result);
        self.ready.notify_all();
    }
}

/// Handle to a submitted task
pub struct TaskHandle<R> {
    chunk: usize,
    slot: Arc<ResultSlot<R>>,
}

impl<R> TaskHandle<R> {
    /// Submission index of the task
    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// Check whether the task has finished, without blocking
    pub fn is_ready(&self) -> bool {
        self.slot.value.lock().is_some()
    }

    /// Block until the task has finished and return its value
    pub fn get(self) -> EngineResult<R> {
        self.join().map(|result| result.value)
    }

    /// Block until the task has finished and return its value with provenance
    pub fn join(self) -> EngineResult<TaskResult<R>> {
        let mut guard = self.slot.value.lock();
        while guard.is_none() {
            self.slot.ready.wait(&mut guard);
        }

        match guard.take() {
            Some(Ok(value)) => Ok(TaskResult {
                chunk: self.chunk,
                value,
            }),
            Some(Err(msg)) => Err(EngineError::WorkerFailed(format!("chunk {}: {}", self.chunk, msg))),
            None => Err(EngineError::WorkerFailed(format!("chunk {}: result already taken", self.chunk))),
        }
    }
}

/// Bounded worker pool running one pure function per chunk
pub struct TaskManager {
    pool: ThreadPool,
    num_workers: usize,
}

impl TaskManager {
    /// Create a dispatcher from a configuration
    pub fn new(config: DispatcherConfig) -> EngineResult<Self> {
        if config.num_workers == 0 {
            return Err(EngineError::InvalidInput(
                "Number of workers must be at least 1".to_string(),
            ));
        }

        let prefix = config.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_workers)
            .thread_name(move |idx| format!("{}-{}", prefix, idx))
            .build()
            .map_err(|e| EngineError::InvalidInput(format!("Failed to create worker pool: {}", e)))?;

        log::info!("Initialized task manager with {} workers", config.num_workers);

        Ok(Self {
            pool,
            num_workers: config.num_workers,
        })
    }

    /// Create a dispatcher with the given number of workers
    pub fn with_workers(num_workers: usize) -> EngineResult<Self> {
        Self::new(DispatcherConfig::default().with_workers(num_workers))
    }

    /// Number of workers in the pool
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    fn spawn<A, R>(&self, chunk: usize, func: fn(A) -> R, args: A) -> TaskHandle<R>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        let slot = Arc::new(ResultSlot::new());
        let worker_slot = Arc::clone(&slot);

        self.pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| func(args)));
            worker_slot.fill(outcome.map_err(panic_message));
        });

        TaskHandle { chunk, slot }
    }

    /// Submit a single task
    pub fn submit<A, R>(&self, func: fn(A) -> R, args: A) -> TaskHandle<R>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        self.spawn(0, func, args)
    }

    /// Submit one task per argument, in iteration order.
    ///
    /// Tasks beyond the worker count wait in the pool queue until a worker is free.
    pub fn parallel_run_func<A, R, I>(&self, func: fn(A) -> R, params: I) -> Vec<TaskHandle<R>>
    where
        A: Send + 'static,
        R: Send + 'static,
        I: IntoIterator<Item = A>,
    {
        let handles: Vec<TaskHandle<R>> = params
            .into_iter()
            .enumerate()
            .map(|(chunk, args)| self.spawn(chunk, func, args))
            .collect();

        log::debug!("Submitted {} tasks to {} workers", handles.len(), self.num_workers);
        handles
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Calculate a chunk size giving every worker several chunks
pub fn calculate_chunk_size(total_rows: usize, num_workers: usize, min_chunk_size: Option<usize>) -> usize {
    let min_size = min_chunk_size.unwrap_or(1).max(1);
    let total_chunks = num_workers.max(1) * MIN_CHUNKS_PER_WORKER;

    let per_chunk = (total_rows + total_chunks - 1) / total_chunks;
    per_chunk.max(min_size)
}

/// Split owned rows into chunks of at most `chunk_size` rows
pub fn chunk_rows<T>(rows: Vec<T>, chunk_size: usize) -> Vec<Vec<T>> {
    let chunks = rows.into_iter().chunks(chunk_size.max(1));
    chunks.into_iter().map(|chunk| chunk.collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_chunk(chunk: Vec<usize>) -> usize {
        chunk.iter().sum()
    }

    fn square_rows(chunk: Vec<(usize, u64)>) -> Vec<(usize, u64)> {
        chunk.into_iter().map(|(row, v)| (row, v * v)).collect()
    }

    fn explode(_: u8) -> u8 {
        panic!("bad chunk")
    }

    #[test]
    fn test_chunk_size_calculation() {
        assert_eq!(calculate_chunk_size(1000, 4, None), 63);
        assert_eq!(calculate_chunk_size(10, 4, Some(100)), 100);
        assert_eq!(calculate_chunk_size(0, 4, None), 1);
    }

    #[test]
    fn test_chunk_rows() {
        let chunks = chunk_rows((0..10).collect::<Vec<_>>(), 4);
        assert_eq!(chunks, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
        assert!(chunk_rows(Vec::<u8>::new(), 4).is_empty());
    }

    #[test]
    fn test_handles_keep_submission_index() {
        let manager = TaskManager::with_workers(2).unwrap();
        let data = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9], vec![10, 11, 12]];

        let handles = manager.parallel_run_func(sum_chunk, data);
        let results: Vec<TaskResult<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(
            results.iter().map(|r| (r.chunk, r.value)).collect::<Vec<_>>(),
            vec![(0, 6), (1, 15), (2, 24), (3, 33)]
        );
    }

    #[test]
    fn test_result_independent_of_worker_count() {
        let rows: Vec<(usize, u64)> = (0..500).map(|i| (i, (i as u64 * 7919) % 101)).collect();

        let run = |workers: usize| {
            let manager = TaskManager::with_workers(workers).unwrap();
            let mut merged: Vec<(usize, u64)> = manager
                .parallel_run_func(square_rows, chunk_rows(rows.clone(), 37))
                .into_iter()
                .flat_map(|h| h.get().unwrap())
                .collect();
            merged.sort_by_key(|(row, _)| *row);
            merged
        };

        assert_eq!(run(1), run(4));
    }

    #[test]
    fn test_panicking_task_is_reported() {
        let manager = TaskManager::with_workers(1).unwrap();
        let handle = manager.submit(explode, 1);
        match handle.get() {
            Err(EngineError::WorkerFailed(msg)) => assert!(msg.contains("bad chunk")),
            other => panic!("Expected WorkerFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(TaskManager::with_workers(0).is_err());
    }
}
