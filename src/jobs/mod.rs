pub mod autoexec;
pub mod job;
pub mod queue;

pub use autoexec::AutoExec;
pub use job::{CodecError, Job};
pub use queue::{JobQueue, QueueError};
