//! Purpose: Define the stable public Rust API boundary for slicecfg.
//! Exports: Core types and operations needed by the C ABI and the CLI.
//! Role: Public, additive-only surface over the marshalling engine.
//! Invariants: Callers prepare jobs and schemas through this module, not core internals.
//! Invariants: Nothing here holds process-wide state; every job brings its own context.

mod job;

pub use crate::core::alias::{AliasEntry, AliasTable, AliasTarget, AliasTransform};
pub use crate::core::diagnostic::{Diagnostic, DiagnosticKind};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::job::{JobContext, Rotation, parse_payload};
pub use crate::core::option_type::{OptionMode, OptionType, Technology};
pub use crate::core::registry::{EnumSymbol, OptionDef, OptionRegistry};
pub use crate::core::schema::{OptionDescriptor, SchemaCategory, SchemaDocument};
pub use crate::core::store::OptionStore;
pub use crate::core::value::{OptionValue, Serialized};
pub use job::{DUMP_CONFIG_ENV, EngineConfig, PreparedJob, describe_config, prepare_job};
