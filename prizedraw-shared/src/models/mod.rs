pub mod pool;
pub mod prize;
