//! Snapshot materialization and manifest reconciliation for the overlay launcher.
//!
//! Turns a launcher manifest into one that loads local overrides, through a
//! multi-stage run: launch-argument patching, registry construction, snapshot
//! materialization, artifact assembly, and cache verification.
//!
//! Override groups under `patches/` are merged onto their up-to-date
//! baseline archive ([`overlay`]) and the merged snapshot replaces the
//! declared artifact of the same logical name.

pub mod archive;
pub mod args;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod report;
pub mod snapshot;

pub use archive::{overlay, overlay_group, OverlayStats};
pub use args::{patch_jvm_args, patch_launch_args};
pub use error::{MaterializeError, Result};
pub use fetch::{location_file_name, remove_stale, FetchConfig, Fetcher, NoProgress, ProgressSink};
pub use pipeline::{ReconcileConfig, ReconcileOutput, Reconciler};
pub use report::{ReconcileReport, ReconciledArtifact};
pub use snapshot::{group_logical_name, slot_files, GroupReport, Materializer, SlotOutcome};
