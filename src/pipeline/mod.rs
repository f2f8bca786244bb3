pub mod async_executor;
pub mod convert;
pub mod executor;


// Re-exports for convenience
pub use async_executor::AsyncPipeline;
pub use convert::{to_async, to_sync, Execute, ExecuteAsync, ToAsync, ToSync};
pub use executor::Pipeline;
