//! Running the external recompression tool

use crate::os::Invocation;
use std::io;
use std::process::{Command, Stdio};
use tracing::{debug, trace};

/// What the tool did once it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub success: bool,
}

impl ToolExit {
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            success: true,
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            code: Some(code),
            success: false,
        }
    }
}

/// Launches one tool invocation and waits for it.
///
/// Implementations must not return before the child has exited and its
/// output streams have been consumed.
pub trait ToolLauncher {
    fn launch(&self, invocation: &Invocation) -> io::Result<ToolExit>;
}

/// Launcher backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl ToolLauncher for ProcessLauncher {
    fn launch(&self, invocation: &Invocation) -> io::Result<ToolExit> {
        // `output()` drains stdout and stderr to EOF before waiting, so a
        // chatty tool can never block on a full pipe.
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()?;

        trace!(
            stdout_bytes = output.stdout.len(),
            "Tool output: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        if !output.status.success() && !output.stderr.is_empty() {
            debug!(
                status = ?output.status.code(),
                "Tool stderr: {}",
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }

        Ok(ToolExit {
            code: output.status.code(),
            success: output.status.success(),
        })
    }
}

impl<L: ToolLauncher + ?Sized> ToolLauncher for &L {
    fn launch(&self, invocation: &Invocation) -> io::Result<ToolExit> {
        (**self).launch(invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::CommandStyle;
    use std::path::Path;

    #[test]
    fn test_missing_executable_is_launch_error() {
        let no_args: [&str; 0] = [];
        let inv = CommandStyle::Direct.build(
            "definitely-not-a-real-pngcrush-binary",
            &no_args,
            Path::new("a.png"),
            Path::new("b.png"),
        );
        let err = ProcessLauncher.launch(&inv).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_is_reported() {
        let inv = Invocation {
            program: "sh".into(),
            args: vec!["-c".into(), "echo noise; exit 3".into()],
        };
        let exit = ProcessLauncher.launch(&inv).unwrap();
        assert_eq!(exit, ToolExit::failed(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stdout_is_drained() {
        // Well above a typical 64 KiB pipe buffer
        let inv = Invocation {
            program: "sh".into(),
            args: vec!["-c".into(), "head -c 1048576 /dev/zero".into()],
        };
        let exit = ProcessLauncher.launch(&inv).unwrap();
        assert!(exit.success);
    }
}
