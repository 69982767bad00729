pub mod enums;
pub mod history;
pub mod medicine;
pub mod settings;

pub use enums::*;
pub use history::*;
pub use medicine::*;
pub use settings::*;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid reminder time: {0} (expected HH:MM)")]
    InvalidTime(String),
}
