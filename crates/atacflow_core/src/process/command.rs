//! Structured command lines for external tools.
//!
//! A `ToolCommand` is either a direct exec (program + argument vector, no
//! shell involved) or a bash script. Redirections are part of the value
//! rather than spliced into a string, so file names never need quoting.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::errors::{ProcessError, ProcessResult};

/// Interpreter used for shell-mode commands.
const SHELL: &str = "bash";

/// How the command is started.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CommandLine {
    /// Exec the program directly with an argument vector.
    Exec { program: OsString, args: Vec<OsString> },
    /// Hand a script to bash (`bash -c <script>`).
    Shell(String),
}

/// A command to run, plus optional stdin/stdout redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    line: CommandLine,
    stdin_from: Option<PathBuf>,
    stdout_to: Option<PathBuf>,
}

impl ToolCommand {
    /// Start building a direct-exec command.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            line: CommandLine::Exec {
                program: program.as_ref().to_os_string(),
                args: Vec::new(),
            },
            stdin_from: None,
            stdout_to: None,
        }
    }

    /// A bash script. Use only where redirection or environment activation
    /// cannot be expressed as an argument vector.
    pub fn shell(script: impl Into<String>) -> Self {
        Self {
            line: CommandLine::Shell(script.into()),
            stdin_from: None,
            stdout_to: None,
        }
    }

    /// Append one argument. Ignored for shell scripts.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        if let CommandLine::Exec { ref mut args, .. } = self.line {
            args.push(arg.as_ref().to_os_string());
        }
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, new_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in new_args {
            self = self.arg(arg);
        }
        self
    }

    /// Read stdin from a file (`< path`).
    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin_from = Some(path.into());
        self
    }

    /// Write stdout to a file, truncating it (`> path`).
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_to = Some(path.into());
        self
    }

    /// Whether this command goes through the shell.
    pub fn is_shell(&self) -> bool {
        matches!(self.line, CommandLine::Shell(_))
    }

    /// Program name used in error messages.
    pub fn program_name(&self) -> String {
        match &self.line {
            CommandLine::Exec { program, .. } => program.to_string_lossy().into_owned(),
            CommandLine::Shell(_) => SHELL.to_string(),
        }
    }

    /// Arguments of a direct-exec command (empty for shell scripts).
    pub fn arguments(&self) -> Vec<String> {
        match &self.line {
            CommandLine::Exec { args, .. } => args
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect(),
            CommandLine::Shell(_) => Vec::new(),
        }
    }

    pub fn stdout_path(&self) -> Option<&Path> {
        self.stdout_to.as_deref()
    }

    pub fn stdin_path(&self) -> Option<&Path> {
        self.stdin_from.as_deref()
    }

    /// Human-readable command line, quoted like a shell would need it.
    pub fn render(&self) -> String {
        let mut out = match &self.line {
            CommandLine::Exec { program, args } => {
                let mut parts = vec![shell_quote(&program.to_string_lossy())];
                parts.extend(args.iter().map(|a| shell_quote(&a.to_string_lossy())));
                parts.join(" ")
            }
            CommandLine::Shell(script) => {
                format!("{} -c {}", SHELL, shell_quote(script.trim()))
            }
        };

        if let Some(ref path) = self.stdin_from {
            out.push_str(" < ");
            out.push_str(&shell_quote(&path.to_string_lossy()));
        }
        if let Some(ref path) = self.stdout_to {
            out.push_str(" > ");
            out.push_str(&shell_quote(&path.to_string_lossy()));
        }
        out
    }

    /// Build a `std::process::Command`, opening redirect files.
    ///
    /// stderr is always inherited so tool diagnostics reach the terminal.
    pub(crate) fn to_command(&self) -> ProcessResult<Command> {
        let mut cmd = match &self.line {
            CommandLine::Exec { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            CommandLine::Shell(script) => {
                let mut cmd = Command::new(SHELL);
                cmd.arg("-c").arg(script);
                cmd
            }
        };

        if let Some(ref path) = self.stdin_from {
            let file = File::open(path)
                .map_err(|e| ProcessError::io(format!("opening {} for stdin", path.display()), e))?;
            cmd.stdin(Stdio::from(file));
        }
        if let Some(ref path) = self.stdout_to {
            let file = File::create(path).map_err(|e| {
                ProcessError::io(format!("creating {} for stdout", path.display()), e)
            })?;
            cmd.stdout(Stdio::from(file));
        }

        Ok(cmd)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Quote a string for bash if it contains anything but safe characters.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',' | '+' | '@' | '%')
        });

    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_exec_with_redirect() {
        let cmd = ToolCommand::new("samtools")
            .args(["idxstats", "/data/S1/S1_align_dedup.bam"])
            .stdout_to("/data/qc/S1/S1_idxstats.txt");

        assert_eq!(
            cmd.render(),
            "samtools idxstats /data/S1/S1_align_dedup.bam > /data/qc/S1/S1_idxstats.txt"
        );
        assert!(!cmd.is_shell());
    }

    #[test]
    fn quotes_awkward_arguments() {
        let cmd = ToolCommand::new("samtools")
            .arg("-e")
            .arg(r#"rname != "chrM""#)
            .arg("my file.bam");

        assert_eq!(
            cmd.render(),
            r#"samtools -e 'rname != "chrM"' 'my file.bam'"#
        );
    }

    #[test]
    fn shell_commands_render_script() {
        let cmd = ToolCommand::shell("echo hi");
        assert!(cmd.is_shell());
        assert_eq!(cmd.program_name(), "bash");
        assert_eq!(cmd.render(), "bash -c 'echo hi'");
    }

    #[test]
    fn shell_ignores_extra_args() {
        let cmd = ToolCommand::shell("true").arg("ignored");
        assert!(cmd.arguments().is_empty());
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain.bam"), "plain.bam");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
