pub mod annotation;
pub mod bosun;
pub mod frame;
pub mod query;
