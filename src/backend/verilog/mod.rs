mod elaborate;
mod utils;

pub use elaborate::{elaborate, elaborate_to_file};
