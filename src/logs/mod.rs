//! Log tail/merge engine for deptail

mod assembler;
mod sink;
mod stream;

pub use assembler::LineAssembler;
pub use sink::LogAggregator;
pub use stream::{LogReader, LogTransport, TailController, TailError};
