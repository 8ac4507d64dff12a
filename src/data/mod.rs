pub mod dataset;
pub mod idx;
pub mod image_input;
pub mod input_fn;
pub mod synthetic;

pub use dataset::{DataSet, Datasets};
pub use idx::load_mnist_32x32;
pub use input_fn::InputFn;
pub use synthetic::synthetic;
