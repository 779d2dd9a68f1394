pub mod hooks;
pub mod java;
pub mod python;
pub mod resolution;
pub mod scanner;
pub mod test_utils;
