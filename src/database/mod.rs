pub mod channel;
pub mod redis_connection;
pub mod token;

pub use redis_connection::RedisDatabase;
