//! Purpose: Prepare one job's configuration from a registry, aliases, and a payload.
//! Exports: `EngineConfig`, `PreparedJob`, `prepare_job`, `describe_config`.
//! Role: Orchestration layer shared by the CLI and the C ABI.
//! Invariants: All per-job state (payload, dump flag, diagnostics) lives in `JobContext`.
//! Invariants: Preparation never fails; problems surface as diagnostics and warn logs.
//! Notes: The finished store and rotation are handed to an external compute collaborator.
use crate::core::alias::AliasTable;
use crate::core::diagnostic::Diagnostic;
use crate::core::error::Error;
use crate::core::option_type::Technology;
use crate::core::job::{JobContext, Rotation};
use crate::core::overrides;
use crate::core::preset;
use crate::core::registry::OptionRegistry;
use crate::core::schema::{self, SchemaDocument};
use crate::core::store::OptionStore;
use serde_json::{Map, Value, json};

pub const DUMP_CONFIG_ENV: &str = "SLICECFG_DUMP_CONFIG";

/// Engine-wide settings that outlive a single job.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub profile: Technology,
    pub apply_preset: bool,
    pub dump_config: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: Technology::Fff,
            apply_preset: true,
            dump_config: false,
        }
    }
}

impl EngineConfig {
    /// Defaults plus the dump flag from `SLICECFG_DUMP_CONFIG` (any value enables it).
    pub fn from_env() -> Self {
        Self {
            dump_config: std::env::var_os(DUMP_CONFIG_ENV).is_some(),
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, profile: Technology) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_preset(mut self, apply_preset: bool) -> Self {
        self.apply_preset = apply_preset;
        self
    }

    pub fn with_dump_config(mut self, dump_config: bool) -> Self {
        self.dump_config = self.dump_config || dump_config;
        self
    }
}

/// Configuration handed to the compute collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedJob {
    pub store: OptionStore,
    pub rotation: Rotation,
    pub diagnostics: Vec<Diagnostic>,
    /// `key = value` lines when a config dump was requested.
    pub dump: Option<Vec<String>>,
}

impl PreparedJob {
    /// `{config, rotation, diagnostics, dump?}` with the store in its exported text form.
    pub fn to_json(&self, registry: Option<&OptionRegistry>) -> Value {
        let empty = OptionRegistry::default();
        let mut out = Map::new();
        out.insert(
            "config".to_string(),
            self.store.export(registry.unwrap_or(&empty)),
        );
        out.insert("rotation".to_string(), json!(self.rotation));
        out.insert("diagnostics".to_string(), json!(self.diagnostics));
        if let Some(dump) = &self.dump {
            out.insert("dump".to_string(), json!(dump));
        }
        Value::Object(out)
    }
}

/// Seed defaults, apply the baseline preset, apply payload overrides, and optionally dump.
pub fn prepare_job(
    registry: Option<&OptionRegistry>,
    aliases: &AliasTable,
    config: &EngineConfig,
    mut ctx: JobContext,
) -> PreparedJob {
    tracing::debug!("job preparation start");
    let mut store = registry.map(OptionStore::seeded).unwrap_or_default();
    if let (Some(registry), true) = (registry, config.apply_preset) {
        let failed = preset::baseline().apply(registry, &mut store);
        tracing::debug!(failed = failed.len(), "baseline preset applied");
    }

    let payload = ctx.take_payload().unwrap_or(Value::Null);
    overrides::apply_overrides(registry, aliases, &mut store, &payload, &mut ctx);
    let rotation = Rotation::from_payload(&payload);

    let dump = (ctx.dump_config() || config.dump_config).then(|| {
        let lines = registry
            .map(|registry| store.dump_lines(registry))
            .unwrap_or_default();
        log_config(&lines);
        lines
    });

    tracing::debug!(
        options = store.len(),
        diagnostics = ctx.diagnostics().len(),
        "job preparation done"
    );
    PreparedJob {
        store,
        rotation,
        diagnostics: ctx.take_diagnostics(),
        dump,
    }
}

fn log_config(lines: &[String]) {
    tracing::info!("config dump begin");
    for line in lines {
        tracing::info!("  {line}");
    }
    tracing::info!("config dump end");
}

/// Project the registry's schema for the engine's profile, stamped with the current time.
pub fn describe_config(
    registry: Option<&OptionRegistry>,
    config: &EngineConfig,
) -> Result<SchemaDocument, Error> {
    let generated_at = schema::timestamp_now()?;
    Ok(schema::project(registry, config.profile, &generated_at))
}
