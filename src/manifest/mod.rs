pub mod model;
pub mod resolve;
