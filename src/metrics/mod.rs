pub mod accuracy;
pub mod mean;

pub use accuracy::Accuracy;
pub use mean::Mean;
