//! Time series built incrementally while a trace loads

pub mod allocations;
pub mod cpu;
pub mod gc;

pub use allocations::{AllocationEvent, AllocationHistory, ClassAllocationPoint};
pub use cpu::{CpuHistory, CpuPoint};
pub use gc::{GcHistory, GcPoint, GcSnapshot};
