pub mod activations;
pub mod bias;

pub use activations::{relu_inplace, relu_scalar};
pub use bias::add_bias;
