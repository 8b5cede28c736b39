pub mod anti_repeat;
pub mod crop;
pub mod similarity;

pub use anti_repeat::AntiRepeat;
