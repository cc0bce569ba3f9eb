mod reader;
mod region;

#[cfg(target_os = "windows")]
mod process;

#[cfg(test)]
pub mod mock;

pub use reader::ReadMemory;
pub use region::{MemoryRegion, ModuleSpan};

#[cfg(target_os = "windows")]
pub use process::{ProcessHandle, ProcessInfo, ProcessMemoryReader, find_processes};

#[cfg(test)]
pub use mock::MockMemoryReader;
