pub mod runtime;

pub use runtime::java_exe;
pub use runtime::resolve_runtime;
pub use runtime::RuntimeConfig;
pub use runtime::RuntimeSelection;
