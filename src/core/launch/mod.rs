pub mod arguments;
pub mod classpath;
pub mod task;

pub use arguments::{expand, PlaceholderContext};
pub use classpath::{build_classpath, ClasspathSet};
pub use task::{
    launch, LaunchCommand, LaunchProfile, LaunchResolver, ManifestPair, ProcessSpawner,
    SystemSpawner,
};
