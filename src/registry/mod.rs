pub mod benchmarks;
pub mod codes;

pub use benchmarks::*;
pub use codes::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Reference data load failed ({0}): {1}")]
    Load(String, String),

    #[error("Reference data parse failed ({0}): {1}")]
    Parse(String, String),
}
