//! Platform-specific process launching.
//!
//! The host family is detected once at startup and turned into a
//! [`CommandStyle`], which is then handed to the crusher so that the
//! per-file logic never asks which OS it is running on.

use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;

/// Operating system family of the host running the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostFamily {
    Windows,
    Unix,
}

impl HostFamily {
    /// Detect the family of the current host.
    pub fn current() -> Self {
        if cfg!(windows) {
            HostFamily::Windows
        } else {
            HostFamily::Unix
        }
    }
}

/// How the external tool is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandStyle {
    /// Run the executable directly.
    Direct,
    /// Run through the command interpreter (`cmd /c`).
    ShellWrapped,
}

impl CommandStyle {
    pub fn for_host(host: HostFamily) -> Self {
        match host {
            HostFamily::Windows => CommandStyle::ShellWrapped,
            HostFamily::Unix => CommandStyle::Direct,
        }
    }

    /// Build the invocation `[cmd /c] tool args... source dest`.
    ///
    /// Arguments are not escaped. They are handed to the process launcher
    /// as separate argv entries, so configured values must come from a
    /// trusted build configuration.
    pub fn build<S: AsRef<OsStr>>(
        &self,
        tool: &str,
        extra_args: &[S],
        source: &Path,
        dest: &Path,
    ) -> Invocation {
        let mut args: Vec<OsString> = Vec::with_capacity(extra_args.len() + 4);
        let program = match self {
            CommandStyle::Direct => OsString::from(tool),
            CommandStyle::ShellWrapped => {
                args.push(OsString::from("/c"));
                args.push(OsString::from(tool));
                OsString::from("cmd")
            }
        };

        args.extend(extra_args.iter().map(|a| a.as_ref().to_os_string()));
        args.push(source.as_os_str().to_os_string());
        args.push(dest.as_os_str().to_os_string());

        Invocation { program, args }
    }
}

/// A fully built command line, ready to be launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
