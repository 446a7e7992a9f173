// src/cli/mod.rs

mod repl;

use clap::{Parser, Subcommand};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

use permitflow_lib::context::{AppCtx, WizardConfig};
use permitflow_lib::draft::{generate_permit_id, validate_permit_id, CommentEntry};
use permitflow_lib::error::{AppError, AppResult};
use permitflow_lib::persistence::{DraftPersistence, FsStorage};
use permitflow_lib::preview::{project, render_text};
use permitflow_lib::review::{LocalRegister, ReviewChannel, ReviewFeedback};
use permitflow_lib::save_log::{recent_save_events, take_save_warn_pending};
use permitflow_lib::template::{builtin_registry, PermitKind, StepRegistry};
use permitflow_lib::types::AppState;

/// Permit-to-work wizard
#[derive(Parser, Debug)]
#[command(name = "permitflow")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Enable debug logging (also: PERMITFLOW_DEBUG=1)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Data directory (also: PERMITFLOW_DATA_DIR)
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Acting role: requester, approver, safety-officer, admin (also: PERMITFLOW_ROLE)
    #[arg(long, global = true)]
    pub role: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new permit and open the wizard
    New {
        /// Permit type: general, ht, gas, or a custom template name
        permit_type: String,
        /// Permit number; generated when omitted
        #[arg(long)]
        id: Option<String>,
    },
    /// Resume a saved draft in the wizard
    Edit { permit_type: String, id: String },
    /// Print the permit as it would be printed
    Preview { permit_type: String, id: String },
    /// List saved drafts and submitted permits
    List { permit_type: String },
    /// Delete a saved draft
    Discard { permit_type: String, id: String },
    /// Post review feedback on a permit as the current role
    Comment {
        id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show the available permit templates and their steps
    Templates,
    /// Show recent save/load failures
    SaveLog,
}

/// Built-in kinds by name; anything else is looked up as `<templates_dir>/<name>.json5`.
pub fn load_registry(ctx: &AppCtx, name: &str) -> AppResult<StepRegistry> {
    if let Ok(kind) = name.parse::<PermitKind>() {
        return Ok(builtin_registry(kind)?);
    }
    let custom = ctx.templates_dir().join(format!("{name}.json5"));
    if custom.is_file() {
        return Ok(StepRegistry::from_path(&custom)?);
    }
    Err(AppError::UnknownPermitType(format!(
        "unknown permit type '{name}' (general|ht|gas or a template in {})",
        ctx.templates_dir().display()
    )))
}

fn persistence_for(
    ctx: &AppCtx,
    state: &Arc<AppState>,
    permit_type: &str,
) -> AppResult<Arc<DraftPersistence>> {
    let registry = Arc::new(load_registry(ctx, permit_type)?);
    let storage = Arc::new(FsStorage::new(ctx.drafts_dir()));
    Ok(Arc::new(DraftPersistence::new(
        storage,
        registry,
        state.clone(),
    )))
}

fn register_for(ctx: &AppCtx) -> LocalRegister {
    LocalRegister::new(Arc::new(FsStorage::new(ctx.register_dir())))
}

pub fn dispatch(
    cmd: Command,
    state: Arc<AppState>,
    ctx: &AppCtx,
    cfg: WizardConfig,
) -> AppResult<()> {
    let result = match cmd {
        Command::New { permit_type, id } => {
            let persistence = persistence_for(ctx, &state, &permit_type)?;
            let id = match id {
                Some(id) => id,
                None => generate_permit_id(persistence.registry().template_id()),
            };
            validate_permit_id(&id).map_err(AppError::InvalidPermitId)?;
            if persistence.load(&id).is_some() {
                println!("A draft for {id} already exists; resuming it.");
            }
            repl::run(persistence, register_for(ctx), &id, cfg)
        }
        Command::Edit { permit_type, id } => {
            let persistence = persistence_for(ctx, &state, &permit_type)?;
            if persistence.load(&id).is_none() {
                return Err(AppError::DraftNotFound(id));
            }
            repl::run(persistence, register_for(ctx), &id, cfg)
        }
        Command::Preview { permit_type, id } => {
            let persistence = persistence_for(ctx, &state, &permit_type)?;
            let register = register_for(ctx);
            let draft = persistence
                .load(&id)
                .or_else(|| register.submitted(&id))
                .ok_or_else(|| AppError::DraftNotFound(id.clone()))?;
            let feedback = register.feedback_for(&id);
            print!(
                "{}",
                render_text(&project(persistence.registry(), &draft, &feedback))
            );
            Ok(())
        }
        Command::List { permit_type } => {
            let persistence = persistence_for(ctx, &state, &permit_type)?;
            let register = register_for(ctx);

            println!("Drafts ({}):", persistence.registry().title());
            for id in persistence.list_ids() {
                match persistence.load(&id) {
                    Some(d) => println!(
                        "  {id}  rev {}  {}",
                        d.revision,
                        d.updated_at
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "never saved by hand".to_string())
                    ),
                    None => println!("  {id}  (unreadable)"),
                }
            }
            println!("Submitted:");
            for id in register.submitted_ids() {
                println!("  {id}");
            }
            Ok(())
        }
        Command::Discard { permit_type, id } => {
            let persistence = persistence_for(ctx, &state, &permit_type)?;
            if !persistence.list_ids().contains(&id) {
                return Err(AppError::DraftNotFound(id));
            }
            if persistence.discard(&id) {
                println!("Discarded draft {id}.");
                Ok(())
            } else {
                Err(AppError::Msg(format!("draft {id} could not be removed")))
            }
        }
        Command::Comment { id, text } => {
            validate_permit_id(&id).map_err(AppError::InvalidPermitId)?;
            let lines: Vec<CommentEntry> = text
                .join(" ")
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(CommentEntry::new)
                .collect();
            if lines.is_empty() {
                return Err(AppError::Msg("comment is empty".to_string()));
            }
            let role = state.role();
            register_for(ctx).post(&id, ReviewFeedback::new(role, lines, Utc::now()))?;
            println!("Feedback posted on {id} as {}.", role.label());
            Ok(())
        }
        Command::Templates => {
            for kind in PermitKind::ALL {
                let reg = builtin_registry(kind)?;
                println!("{kind}: {}", reg.title());
                for (i, s) in reg.steps().iter().enumerate() {
                    println!("  {}. {} ({})", i + 1, s.name, s.id);
                }
            }
            Ok(())
        }
        Command::SaveLog => {
            for ev in recent_save_events(&state) {
                println!(
                    "#{} {} {:?} {} key={} {}",
                    ev.id, ev.ts_ms, ev.class, ev.context, ev.key, ev.msg
                );
            }
            Ok(())
        }
    };

    if take_save_warn_pending(&state) {
        eprintln!("warning: some drafts could not be saved; run `permitflow save-log` for details");
    }
    result
}
