//! Built-in field rules

pub mod custom;
pub mod email;
pub mod length;
pub mod numeric;
pub mod pattern;
pub mod required;
