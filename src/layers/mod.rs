pub mod dense;

pub use dense::{Dense, DenseGradients};
