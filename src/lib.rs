//! Word, character n-gram and stroke n-gram embeddings, trained with
//! skip-gram style negative sampling on lock-free shared matrices.

#[allow(non_camel_case_types)]
pub type real = f32; // Precision of float numbers

pub mod alphabet;
pub mod args;
pub mod dictionary;
pub mod error;
pub mod matrix;
pub mod model;
pub mod train;
mod utf8;

pub use args::{Args, ModelKind};
pub use dictionary::Dictionary;
pub use error::TrainError;
pub use matrix::{Matrix, Vector};
pub use model::Model;
pub use train::{Checkpoint, Trainer};
