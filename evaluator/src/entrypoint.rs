//! Entrypoint resolution: find the command that runs a candidate pipeline.
//!
//! Resolution strategies are tried in strict priority order: operator
//! override, root script candidates, module candidates, instruction-derived
//! command. The instruction-derived strategy is a best-effort heuristic and
//! can be configured to take precedence over auto-discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Root entry points, run as a script (`python main.py`).
pub const ROOT_CANDIDATES: &[&str] = &["main.py", "run_pipeline.py"];

/// Module entry points, run as a module (`python -m src.main`).
pub const MODULE_CANDIDATES: &[&str] = &["src/main.py", "src/run_pipeline.py"];

/// A discovered pipeline entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    /// Path relative to the repository root.
    pub rel_path: PathBuf,
    /// True when the file must be invoked as a module.
    pub is_module: bool,
}

/// Locate the pipeline entry file, first existing candidate wins.
pub fn find_entrypoint(root: &Path) -> Option<Entrypoint> {
    for name in ROOT_CANDIDATES {
        if root.join(name).is_file() {
            return Some(Entrypoint {
                rel_path: PathBuf::from(name),
                is_module: false,
            });
        }
    }
    for rel in MODULE_CANDIDATES {
        if root.join(rel).is_file() {
            return Some(Entrypoint {
                rel_path: PathBuf::from(rel),
                is_module: true,
            });
        }
    }
    None
}

/// Build the command string as a user would run it.
pub fn command_string(entry: &Entrypoint) -> String {
    if entry.is_module {
        let dotted: Vec<String> = entry
            .rel_path
            .with_extension("")
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("python -m {}", dotted.join("."))
    } else {
        format!("python {}", entry.rel_path.display())
    }
}

/// Resolve the run command through the ordered strategy chain.
///
/// `instruction_command` is only invoked when its turn comes, so the agent
/// collaborator is not consulted unless needed. An empty or unparseable
/// instruction-derived result means "no command found", never an error.
pub fn resolve_command(
    root: &Path,
    override_command: Option<&str>,
    prefer_instruction: bool,
    instruction_command: impl FnOnce() -> Option<String>,
) -> Option<String> {
    if let Some(cmd) = override_command {
        let cmd = cmd.trim();
        if !cmd.is_empty() {
            debug!(cmd, "using operator-forced run command");
            return Some(cmd.to_string());
        }
    }

    let discovered = || find_entrypoint(root).map(|entry| command_string(&entry));

    let resolved = if prefer_instruction {
        let mut instruction = instruction_command();
        if let Some(cmd) = &instruction
            && cmd.trim().is_empty()
        {
            instruction = None;
        }
        instruction.or_else(discovered)
    } else {
        let mut resolved = discovered();
        if resolved.is_none() {
            resolved = instruction_command().filter(|cmd| !cmd.trim().is_empty());
        }
        resolved
    };
    if let Some(cmd) = &resolved {
        debug!(cmd, "resolved run command");
    }
    resolved
}
