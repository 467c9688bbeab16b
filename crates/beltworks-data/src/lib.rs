pub mod loader;

pub use loader::{
    DataLoadError, Format, load_config, load_save_into, read_save_file, write_save_file,
};
