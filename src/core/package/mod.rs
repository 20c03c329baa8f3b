pub mod extract;
pub mod marker;
pub mod protected;
pub mod sync;

pub use extract::{extract_archive, ExtractStats};
pub use marker::{MarkerPolicy, VersionMarker};
pub use protected::ProtectedPaths;
pub use sync::{
    ChannelObserver, NoopObserver, PackageProfile, PackageSynchronizer, SyncEvent, SyncObserver,
    SyncOutcome, SyncPhase,
};
