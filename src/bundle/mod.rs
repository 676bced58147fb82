pub mod assemble;
pub mod frame;
