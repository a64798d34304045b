//! Purpose: Hold top-level CLI command dispatch for `slicecfg`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: stdout carries exactly one JSON document per successful command.
//! Invariants: Helpers in `main.rs` remain the source of emission and error formatting.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    engine: EngineSources,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "slicecfg", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Schema => {
            let registry = engine.load_registry()?;
            let doc = describe_config(registry.as_ref(), &engine.config)?;
            let value = serde_json::to_value(&doc).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode schema")
                    .with_source(err)
            })?;
            emit_json(value, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Apply {
            payload,
            file,
            no_preset,
            dump_config,
        } => {
            let payload = read_payload(payload.as_deref(), file.as_deref())?;
            let registry = engine.load_registry()?;
            let aliases = engine.load_aliases()?;
            let config = engine
                .config
                .clone()
                .with_preset(!no_preset)
                .with_dump_config(dump_config);
            let job = prepare_job(registry.as_ref(), &aliases, &config, job_context(payload));
            emit_diagnostics(&job.diagnostics, "apply", color_mode);
            emit_json(job.to_json(registry.as_ref()), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Get {
            keys,
            payload,
            no_preset,
        } => {
            let Some(registry) = engine.load_registry()? else {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("get requires an option registry")
                    .with_hint("Pass --registry <PATH> or set SLICECFG_REGISTRY."));
            };
            if let Some(missing) = keys.iter().find(|key| !registry.contains(key)) {
                return Err(Error::new(ErrorKind::NotFound)
                    .with_message("unknown option key")
                    .with_key(missing.as_str())
                    .with_hint("Run `slicecfg schema` to list option keys."));
            }
            let payload = payload.as_deref().map(parse_payload).transpose()?;
            let aliases = engine.load_aliases()?;
            let config = engine.config.clone().with_preset(!no_preset);
            let job = prepare_job(Some(&registry), &aliases, &config, job_context(payload));
            emit_diagnostics(&job.diagnostics, "get", color_mode);

            let mut values = Map::new();
            for key in &keys {
                let (Some(def), Some(value)) = (registry.get(key), job.store.get(key)) else {
                    continue;
                };
                values.insert(key.clone(), json!(def.serialize_value(value)));
            }
            emit_json(Value::Object(values), color_mode);
            Ok(RunOutcome::ok())
        }
    }
}
