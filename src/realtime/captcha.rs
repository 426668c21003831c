use std::process::Stdio;

use tokio::{io::AsyncWriteExt, process::Command};

use super::{Error, RtResult};

/// Turns a captcha image into its text
#[allow(async_fn_in_trait)]
pub trait CaptchaSolver {
    async fn solve(&self, image: &[u8]) -> RtResult<String>;
}

/// Solves captchas with an external program, which gets the image on stdin
/// and prints the answer
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSolver {
    program: String,
    args: Vec<String>,
}

impl CommandSolver {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a command line such as "python3 solve.py --quiet" on whitespace
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

impl CaptchaSolver for CommandSolver {
    async fn solve(&self, image: &[u8]) -> RtResult<String> {
        log::debug!("Solving {} byte captcha with {}", image.len(), self.program);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // a solver may exit without reading everything, its status tells what happened
            if let Err(e) = stdin.write_all(image).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(Error::Captcha(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if answer.is_empty() {
            return Err(Error::Captcha(format!("{} gave no answer", self.program)));
        }

        Ok(answer)
    }
}
