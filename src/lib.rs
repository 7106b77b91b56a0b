#![doc = include_str!("../README.md")]
#![warn(missing_debug_implementations, missing_docs, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod common;
pub use common::{AccountKey, KeySourceError, LaunchError, RotateError, SecretError, Step};

mod keys;
pub use keys::{FilesystemKeys, KeyList, KeySource};

mod secret;
pub use secret::{FileSecret, InMemorySecret, SecretSlot};

mod external;
pub use external::{
    Approver, CommandApprover, CommandTestRunner, ExternalCommand, Outcome, TestRunner,
};

mod policy;
pub use policy::{FailurePolicy, Pacing, ParsePolicyError};

mod rotator;
pub use rotator::{Rotator, RunSummary};
