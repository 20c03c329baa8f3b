// ─── Packlaunch Core ───
// Package synchronizer and layered game launcher.
//
// Architecture:
//   core/
//     package/    Protected paths, streaming extractor, version marker, sync state machine
//     version/    Dependency manifests + OS rules
//     maven/      Coordinate parsing for library paths
//     launch/     Classpath merge, placeholder expansion, command + spawner
//     java/       Bundled runtime lookup with external fallback
//     auth/       Offline player profile
//     state/      Settings + explicit application state

pub mod auth;
pub mod error;
pub mod java;
pub mod launch;
pub mod maven;
pub mod package;
pub mod state;
pub mod version;
