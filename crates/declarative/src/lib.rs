//! # Declarative
//!
//! Reconciliation engine for a single workstation's configuration.
//!
//! A user declares desired state (packages, casks, App Store apps, OS
//! preference keys, Dock apps, wallpaper, git settings, managed files).
//! The engine observes current state, computes a typed [`Diff`] and applies
//! the non-trivial entries, tolerating partial failure.
//!
//! ## Core Concepts
//!
//! - **DesiredConfig**: the strictly parsed declarative document
//! - **ObservedState**: freshly collected state, one mapping per kind
//! - **PersistedRecord**: settings identities declared at the last apply,
//!   the only cross-run state, used to detect removed settings safely
//! - **Diff**: pure function of desired, observed, record and strictness
//! - **Orchestrator**: executes a diff in fixed domain order, coalescing
//!   subsystem restarts
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     AutoConfirm, DesiredConfig, DiffContext, NoProgress, RecordStore, Session,
//! };
//!
//! let desired = DesiredConfig::load("config.toml".as_ref())?;
//! let store = RecordStore::new(state_dir.join("record.json"));
//! let ctx = DiffContext::new(home, config_dir).strict(false);
//!
//! let outcome = Session::new(&desired, &store, ctx).run(
//!     &collector,
//!     &mut executor,
//!     &mut NoProgress,
//!     &mut AutoConfirm,
//!     false,
//! )?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`CommandRunner`]: runs external commands
//! - [`Collector`]: observes current state per resource kind
//! - [`Executor`]: executes one diff entry per call
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations

pub mod context;
pub mod desired;
pub mod diff;
pub mod error;
pub mod executor;
pub mod reconcile;
pub mod record;
pub mod restart;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use context::{
    AutoConfirm, AutoDecline, Collector, CommandRunner, ConfirmCallback, Executor, NoProgress,
    ProgressCallback, collect_observed, render_command,
};
pub use desired::{
    AppStoreApp, DesiredConfig, DockApp, GitKey, GitScope, GitSetting, ManagedFile, Setting,
    SettingKey,
};
pub use diff::{DiffContext, compute_diff, diff_dock, expand_with, generated_path};
pub use error::{Error, Result};
pub use executor::{DOCK_SUBSYSTEM, Orchestrator};
pub use reconcile::{Outcome, Session};
pub use record::{PersistedRecord, RecordStore};
pub use restart::{RestartCoalescer, subsystem_for};
pub use types::{
    AppDiff, ApplyReport, ApplyResult, CommandOutput, Diff, DiffAction, DiffSummary, DockDiff,
    ExecuteSummary, FileDiff, GitDiff, ObservedState, PackageDiff, SettingDiff, WallpaperDiff,
};
pub use value::{Value, ValueType, coerce, format_write_args, infer_type, values_equal};
