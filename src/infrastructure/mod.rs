pub mod in_memory;
pub mod receiver;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
