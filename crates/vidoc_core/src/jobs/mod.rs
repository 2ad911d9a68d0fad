//! Job lifecycle: ids and paths, status records and stores, the worker
//! pool, upload intake and the TTL cleaner.

pub mod cleaner;
pub mod intake;
pub mod paths;
pub mod pool;
pub mod status;
pub mod store;

pub use cleaner::{CleanupReport, JobCleaner};
pub use intake::{intake, IntakeError};
pub use paths::{new_job_id, validate_job_id, JobPaths, PathError};
pub use pool::{panic_message, JobHandler, JobTicket, PoolError, WorkerPool};
pub use status::{JobStatus, StatusRecord, TransitionError};
pub use store::{FileStatusStore, MemoryStatusStore, StatusStore, StoreError, StoreResult};
