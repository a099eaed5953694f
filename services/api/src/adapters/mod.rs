pub mod assistant;
pub mod blob_http;
pub mod blob_memory;
pub mod kv_memory;
pub mod kv_redis;

pub use assistant::OpenAiAssistantAdapter;
pub use blob_http::HttpBlobStore;
pub use blob_memory::MemoryBlobStore;
pub use kv_memory::MemoryKvStore;
pub use kv_redis::RedisKvStore;
