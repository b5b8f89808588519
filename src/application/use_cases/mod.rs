mod load_directory;

pub use load_directory::*;
