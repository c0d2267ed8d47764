pub mod in_memory;
pub mod journal;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod settings_file;
pub mod simulated;
