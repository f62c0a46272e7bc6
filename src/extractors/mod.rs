pub mod microsoft;

pub use microsoft::{EmbedRef, MicrosoftExtractor};
