//! qrscan library exports for testing

pub mod capture;
pub mod core;
pub mod decode;
pub mod tui;

#[cfg(test)]
pub mod test_support;
