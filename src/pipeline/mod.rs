pub mod dispatcher;
pub mod job_runner;
pub mod orchestrator;
pub mod output;

pub use dispatcher::apply;
pub use output::{OutputKind, TransformOutput};
