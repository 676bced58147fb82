pub mod create;
pub mod job;
