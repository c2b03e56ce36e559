// judge-providers/src/builder.rs
// ============================================================================
// Module: Submission Builder
// Description: Resolves a language tag to a compile/run profile, compiles
//              source into a scratch workspace, and delegates execution
//              to the Sandboxed Executor.
// Purpose: The reference implementation of judge-core's SubmissionBuilder
//          contract (§4.4).
// Dependencies: cap-std, judge-core, std::process
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use judge_core::CompileError;
use judge_core::ExecError;
use judge_core::ExecOutcome;
use judge_core::ExecRequest;
use judge_core::Fingerprint;
use judge_core::SubmissionBuilder;
use thiserror::Error;

use crate::sandbox::SandboxedExecutor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Memory ceiling applied to the compiler subprocess itself, independent
/// of the per-request `max_memory_kb` (compilers routinely need more
/// headroom than the contestant's run-time budget). 1 GiB.
const COMPILE_MEMORY_KB: u64 = 1_048_576;

/// A per-language compile/run profile, resolved from a [`LanguageRegistry`]
/// by language tag.
///
/// Grounded in §4.4: "an expansion point over the original's hardcoded
/// per-language branches". Two shapes are supported: a compiled profile
/// that runs a compiler to produce a native artifact, and an interpreted
/// profile that wraps the interpreter invocation in a small shebang
/// script so the resulting "artifact" still satisfies the
/// `SubmissionBuilder::artifact_path` contract of one bare executable
/// with no argv.
#[derive(Debug, Clone)]
pub enum LanguageProfile {
    /// A language whose submissions are compiled to a native executable.
    Compiled {
        /// Source file name written into the scratch workspace.
        source_filename: String,
        /// Artifact file name produced by the compile command.
        artifact_filename: String,
        /// Compile command argv. `{src}` and `{out}` are substituted
        /// with the absolute source and artifact paths.
        compile_command: Vec<String>,
    },
    /// A language whose submissions are run directly by an interpreter.
    Interpreted {
        /// Source file name written into the scratch workspace.
        source_filename: String,
        /// Run command argv, e.g. `["/usr/bin/env", "python3", "{src}"]`.
        /// `{src}` is substituted with the absolute source path.
        command_template: Vec<String>,
    },
}

impl LanguageProfile {
    /// Returns the source file name this profile expects.
    #[must_use]
    pub fn source_filename(&self) -> &str {
        match self {
            Self::Compiled { source_filename, .. } | Self::Interpreted { source_filename, .. } => source_filename,
        }
    }
}

/// A daemon-configured language's compile/run command templates, decoupled
/// from any particular configuration crate's own struct so this crate need
/// not depend on one — the caller (typically `judge-cli`, which wires a
/// configuration layer to this registry) does the field-for-field
/// translation.
#[derive(Debug, Clone)]
pub struct ConfiguredLanguage {
    /// Whitespace-separated compile command template, or `None` for an
    /// interpreted language with no compile step.
    pub compile_command: Option<String>,
    /// Whitespace-separated run command template.
    pub run_command: String,
    /// Source file name written into the scratch workspace.
    pub source_file: String,
    /// Artifact file name produced by compilation.
    pub artifact_file: String,
}

/// Maps a language tag (as carried on [`judge_core::JudgeRequest::sub_lang`])
/// to its [`LanguageProfile`].
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    profiles: HashMap<String, LanguageProfile>,
}

impl LanguageRegistry {
    /// Builds a registry from an explicit `(tag, profile)` table.
    #[must_use]
    pub fn new(profiles: HashMap<String, LanguageProfile>) -> Self {
        Self { profiles }
    }

    /// Builds the registry of languages this reference implementation
    /// ships out of the box: `cpp17`, `c11`, and `python3`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let strs = |tokens: &[&str]| tokens.iter().map(|token| (*token).to_string()).collect();
        let mut profiles = HashMap::new();
        profiles.insert(
            "cpp17".to_string(),
            LanguageProfile::Compiled {
                source_filename: "main.cpp".to_string(),
                artifact_filename: "main".to_string(),
                compile_command: strs(&["/usr/bin/g++", "-O2", "-std=c++17", "-o", "{out}", "{src}"]),
            },
        );
        profiles.insert(
            "c11".to_string(),
            LanguageProfile::Compiled {
                source_filename: "main.c".to_string(),
                artifact_filename: "main".to_string(),
                compile_command: strs(&["/usr/bin/gcc", "-O2", "-std=c11", "-o", "{out}", "{src}"]),
            },
        );
        profiles.insert(
            "python3".to_string(),
            LanguageProfile::Interpreted {
                source_filename: "main.py".to_string(),
                command_template: strs(&["/usr/bin/python3", "{src}"]),
            },
        );
        Self { profiles }
    }

    /// Builds a registry from a daemon-configured language table (tag →
    /// compile/run command templates), translating each entry into a
    /// [`LanguageProfile`]. A `compile_command` of `None` in the config
    /// entry yields a [`LanguageProfile::Interpreted`] profile whose
    /// `command_template` is the entry's `run_command`, split on
    /// whitespace.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, ConfiguredLanguage)>) -> Self {
        let mut profiles = HashMap::new();
        for (tag, entry) in entries {
            let profile = match entry.compile_command {
                Some(compile_command) => LanguageProfile::Compiled {
                    source_filename: entry.source_file,
                    artifact_filename: entry.artifact_file,
                    compile_command: split_command_template(&compile_command),
                },
                None => LanguageProfile::Interpreted {
                    source_filename: entry.source_file,
                    command_template: split_command_template(&entry.run_command),
                },
            };
            profiles.insert(tag, profile);
        }
        Self { profiles }
    }

    /// Resolves `lang` to its profile.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::UnknownLanguage`] if no profile is
    /// registered for `lang`.
    pub fn resolve(&self, lang: &str) -> Result<&LanguageProfile, BuilderError> {
        self.profiles.get(lang).ok_or_else(|| BuilderError::UnknownLanguage(lang.to_string()))
    }
}

/// Errors from [`ProcessSubmissionBuilder`] that do not fit
/// [`judge_core::CompileError`]'s "ordinary terminal verdict" shape.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// No [`LanguageProfile`] is registered for the requested tag.
    #[error("no language profile registered for {0:?}")]
    UnknownLanguage(String),
}

/// Process-based [`SubmissionBuilder`]: compiles into a `cap_std`-scoped
/// scratch workspace under the daemon's sandbox root, then delegates
/// execution to [`SandboxedExecutor`].
pub struct ProcessSubmissionBuilder<'a> {
    executor: &'a SandboxedExecutor,
    workspace_dir: PathBuf,
    profile: LanguageProfile,
    artifact_path: Option<PathBuf>,
}

impl<'a> ProcessSubmissionBuilder<'a> {
    /// Builds a submission builder rooted at
    /// `sandbox_root/sub-<sub_fingerprint>`, resolving `lang` from
    /// `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::UnknownLanguage`] if `lang` is not
    /// registered.
    pub fn new(executor: &'a SandboxedExecutor, sandbox_root: &Path, sub_fingerprint: &Fingerprint, lang: &str, registry: &LanguageRegistry) -> Result<Self, BuilderError> {
        let profile = registry.resolve(lang)?.clone();
        let workspace_dir = sandbox_root.join(format!("sub-{sub_fingerprint}"));
        Ok(Self {
            executor,
            workspace_dir,
            profile,
            artifact_path: None,
        })
    }

    /// Opens (creating if necessary) the workspace directory as a
    /// capability handle, scoped so writes cannot escape it via a
    /// symlink or `..` component.
    fn open_workspace(&self) -> Result<Dir, std::io::Error> {
        std::fs::create_dir_all(&self.workspace_dir)?;
        Dir::open_ambient_dir(&self.workspace_dir, ambient_authority())
    }
}

impl SubmissionBuilder for ProcessSubmissionBuilder<'_> {
    fn compile(&mut self, code: &[u8], lang: &str, time_budget_ms: u64) -> Result<(), CompileError> {
        let workspace = self.open_workspace().map_err(|err| CompileError {
            diagnostic: format!("failed to create submission workspace: {err}"),
        })?;

        let source_filename = self.profile.source_filename();
        let mut source_file = workspace.create(source_filename).map_err(|err| CompileError {
            diagnostic: format!("failed to write source file: {err}"),
        })?;
        source_file.write_all(code).map_err(|err| CompileError {
            diagnostic: format!("failed to write source file: {err}"),
        })?;
        drop(source_file);

        let source_path = self.workspace_dir.join(source_filename);
        tracing::debug!(lang, bytes = code.len(), "submission source written");

        match &self.profile {
            LanguageProfile::Interpreted { command_template, .. } => {
                let artifact_path = self.workspace_dir.join("run.sh");
                let argv = expand_command(command_template, &source_path, &source_path);
                let command_line = argv.iter().map(|token| shell_quote_str(token)).collect::<Vec<_>>().join(" ");
                let script = format!("#!/bin/sh\nexec {command_line} \"$@\"\n");
                std::fs::write(&artifact_path, script).map_err(|err| CompileError {
                    diagnostic: format!("failed to write interpreter wrapper: {err}"),
                })?;
                set_executable(&artifact_path).map_err(|err| CompileError {
                    diagnostic: format!("failed to mark interpreter wrapper executable: {err}"),
                })?;
                self.artifact_path = Some(artifact_path);
                Ok(())
            }
            LanguageProfile::Compiled { artifact_filename, compile_command, .. } => {
                let artifact_path = self.workspace_dir.join(artifact_filename);
                let argv = expand_command(compile_command, &source_path, &artifact_path);
                let request = ExecRequest {
                    artifact: PathBuf::from(&argv[0]),
                    args: argv[1..].to_vec(),
                    stdin_file: None,
                    stdout_file: self.workspace_dir.join("compile.out"),
                    stderr_file: self.workspace_dir.join("compile.err"),
                    max_time_ms: time_budget_ms,
                    max_memory_kb: COMPILE_MEMORY_KB,
                    idle_timeout_ms: None,
                    trusted: false,
                };
                let outcome = self.executor.execute(&request).map_err(|err| CompileError {
                    diagnostic: format!("failed to launch compiler: {err}"),
                })?;
                if !outcome.exited_normally() || outcome.exit_code != Some(0) {
                    let diagnostic = std::fs::read_to_string(&request.stderr_file).unwrap_or_default();
                    return Err(CompileError {
                        diagnostic: if diagnostic.is_empty() {
                            format!("compiler terminated abnormally: {}", outcome.termination)
                        } else {
                            diagnostic
                        },
                    });
                }
                self.artifact_path = Some(artifact_path);
                Ok(())
            }
        }
    }

    fn run(&self, request: &ExecRequest) -> Result<ExecOutcome, ExecError> {
        self.executor.execute(request)
    }

    fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    fn clean(&mut self) {
        let _ = std::fs::remove_dir_all(&self.workspace_dir);
    }
}

/// Substitutes `{src}` and `{out}` placeholders in a compile command
/// template with the absolute source and artifact paths.
fn expand_command(template: &[String], src: &Path, out: &Path) -> Vec<String> {
    template
        .iter()
        .map(|token| match token.as_str() {
            "{src}" => src.display().to_string(),
            "{out}" => out.display().to_string(),
            other => other.to_string(),
        })
        .collect()
}

/// Splits a whitespace-separated command template string into argv
/// tokens, translating the configuration layer's `{artifact}` placeholder
/// to the `{out}` token [`expand_command`] recognizes.
fn split_command_template(template: &str) -> Vec<String> {
    template.split_whitespace().map(|token| if token == "{artifact}" { "{out}".to_string() } else { token.to_string() }).collect()
}

/// Single-quotes a token for embedding in a generated `/bin/sh` wrapper
/// script. Single-quoting is sufficient since scratch paths never
/// contain a single quote (the fingerprint alphabet is path-safe per
/// [`judge_core::Fingerprint::new`]).
fn shell_quote_str(token: &str) -> String {
    format!("'{token}'")
}

/// Marks `path` executable (`0o755`) on Unix.
fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_docs_in_private_items,
    reason = "test assertions use panic-based helpers for clarity"
)]
mod tests {
    use std::os::unix::fs::PermissionsExt as _;

    use super::*;

    #[test]
    fn unknown_language_is_rejected() {
        let registry = LanguageRegistry::with_defaults();
        assert!(matches!(registry.resolve("brainfuck"), Err(BuilderError::UnknownLanguage(_))));
    }

    #[test]
    fn interpreted_submission_produces_executable_wrapper() {
        let dir = tempfile::tempdir().expect("tempdir");
        let executor = SandboxedExecutor::new();
        let registry = LanguageRegistry::with_defaults();
        let fingerprint = Fingerprint::new("sub1").expect("valid");
        let mut builder = ProcessSubmissionBuilder::new(&executor, dir.path(), &fingerprint, "python3", &registry).expect("resolves");

        builder.compile(b"print('hi')", "python3", 15_000).expect("compiles");
        let artifact = builder.artifact_path().expect("artifact present");
        assert!(artifact.exists());
        let metadata = std::fs::metadata(artifact).expect("metadata");
        assert_ne!(metadata.permissions().mode() & 0o111, 0);
    }

    #[test]
    fn from_entries_builds_compiled_and_interpreted_profiles() {
        let mut entries = HashMap::new();
        entries.insert(
            "cpp17".to_string(),
            ConfiguredLanguage {
                compile_command: Some("g++ -O2 -std=c++17 -o {artifact} {src}".to_string()),
                run_command: "{artifact}".to_string(),
                source_file: "main.cpp".to_string(),
                artifact_file: "main".to_string(),
            },
        );
        entries.insert(
            "python3".to_string(),
            ConfiguredLanguage {
                compile_command: None,
                run_command: "/usr/bin/env python3 {src}".to_string(),
                source_file: "main.py".to_string(),
                artifact_file: "main.py".to_string(),
            },
        );
        let registry = LanguageRegistry::from_entries(entries);

        let cpp = registry.resolve("cpp17").expect("resolves");
        assert!(matches!(cpp, LanguageProfile::Compiled { .. }));

        let python = registry.resolve("python3").expect("resolves");
        match python {
            LanguageProfile::Interpreted { command_template, .. } => {
                assert_eq!(command_template, &vec!["/usr/bin/env".to_string(), "python3".to_string(), "{src}".to_string()]);
            }
            LanguageProfile::Compiled { .. } => panic!("expected interpreted profile"),
        }
    }

    #[test]
    fn clean_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let executor = SandboxedExecutor::new();
        let registry = LanguageRegistry::with_defaults();
        let fingerprint = Fingerprint::new("sub1").expect("valid");
        let mut builder = ProcessSubmissionBuilder::new(&executor, dir.path(), &fingerprint, "python3", &registry).expect("resolves");
        builder.clean();
        builder.clean();
    }
}
