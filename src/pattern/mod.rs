pub mod glob;
pub mod path;

pub use glob::{compile_insensitive, is_glob, to_path_regex, to_search_regex};
pub use path::{PathSpec, expand_home, matches_path, normalize};
