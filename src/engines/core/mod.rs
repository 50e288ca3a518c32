//! Core engine services: buffered I/O and the parallel task dispatcher

pub mod io;
pub mod parallel;

pub use io::{FastReader, FastWriter, MappedFile};
pub use parallel::{DispatcherConfig, TaskHandle, TaskManager, TaskResult};
