//! # Activation Functions Module
//!
//! Element-wise non-linearities used inside the agents' projection heads.
//!
//! ## Available Activations
//!
//! - **ReLU**: `max(0, x)`, the default for hidden layers
//! - **Linear**: identity
//!
//! ## Usage Example
//!
//! ```rust
//! use emcom::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![[1.0, -0.5], [0.0, 2.0]];
//! Activation::Relu.apply_batch(&mut data);
//! assert_eq!(data, array![[1.0, 0.0], [0.0, 2.0]]);
//! ```

pub mod functions;

pub use functions::{Activation, softmax_rows};
