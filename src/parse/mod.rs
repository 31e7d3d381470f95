mod decode;
mod encode;
mod options;
mod patch;
mod wire;

pub use decode::decode;
pub use encode::encode;
pub use options::{DecodeOptions, MissingDeclaredFlagStrategy, UnknownFlagKeyStrategy, Warning};
pub use patch::apply_patch;
