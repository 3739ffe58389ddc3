mod expirable;
mod storage;

pub use expirable::DynamoDbStorageExpirable;
pub use storage::{DynamoDbStorage, BATCH_GET_LIMIT, BATCH_WRITE_LIMIT};
