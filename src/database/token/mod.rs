mod model;
mod redis_repository;

pub use model::*;
pub use redis_repository::*;
