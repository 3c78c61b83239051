use std::process::Output;

/// Result of running an external tool to completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_owned()
    }

    /// Human readable reason of a failed run.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr_text();

        if !stderr.is_empty() {
            stderr
        } else {
            match self.code {
                Some(code) => format!("exited with code {}", code),
                None => "terminated by signal".to_owned(),
            }
        }
    }
}

impl From<Output> for ToolOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Quote arguments containing spaces, for logging a command line.
pub(crate) fn display_args<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    args.into_iter()
        .map(|x| {
            let x = x.as_ref().to_string_lossy();
            if x.contains(' ') {
                format!("\"{}\"", x)
            } else {
                x.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
