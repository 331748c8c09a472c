pub mod annotations;
pub mod health;
pub mod query;
