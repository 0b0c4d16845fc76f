// # State Store Implementations
//
// Last-known-state persistence for callers that converge resources across
// repeated runs.

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;
