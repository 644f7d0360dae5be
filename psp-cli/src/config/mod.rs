mod loader;

pub use loader::{ConfigLoader, ConfigOverrides};
