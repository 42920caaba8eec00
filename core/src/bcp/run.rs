use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::info;

use crate::bcp::command::{display_command_line, BcpCommand, BcpCommandError};
use crate::database::mssql::creds::SqlCreds;

#[derive(thiserror::Error, Debug)]
pub enum BcpRunError {
    #[error(
        "the bcp utility was not found on PATH or at the given path, install the mssql-tools \
         package or pass an explicit bcp path"
    )]
    BcpNotFound(#[source] std::io::Error),

    #[error("failed to run bcp: {0}")]
    Io(std::io::Error),

    #[error("bcp command failed with exit code {code}: {details:?}")]
    NonZeroExit { code: i32, details: Vec<String> },

    #[error("{0}")]
    Command(#[from] BcpCommandError),
}

fn map_spawn_error(error: std::io::Error) -> BcpRunError {
    if error.kind() == ErrorKind::NotFound {
        BcpRunError::BcpNotFound(error)
    } else {
        BcpRunError::Io(error)
    }
}

async fn drain_lines<R>(reader: Option<R>, print_output: bool) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut output = Vec::new();
    let Some(reader) = reader else {
        return output;
    };

    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if print_output {
            println!("{line}");
        }
        info!("{}", line);
        output.push(line);
    }
    output
}

/// Runs the command, streaming stdout and stderr line by line while the
/// caller waits. Every line is logged, and optionally mirrored to stdout.
///
/// Returns the exit code and all captured output lines.
pub async fn run_command(
    mut command: Command,
    print_output: bool,
) -> Result<(i32, Vec<String>), std::io::Error> {
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (mut output, stderr_output) =
        tokio::join!(drain_lines(stdout, print_output), drain_lines(stderr, print_output));
    output.extend(stderr_output);

    let status = child.wait().await?;
    Ok((status.code().unwrap_or(-1), output))
}

/// Invokes bcp for the given command, relaying its output.
///
/// A non-zero exit code is an error carrying the `Error =` lines bcp printed.
pub async fn run_bcp(
    command: &BcpCommand,
    creds: &SqlCreds,
    print_output: bool,
) -> Result<Vec<String>, BcpRunError> {
    let args = command.args(creds)?;
    let program = command.program();

    info!(
        "Executing bcp command: {}",
        display_command_line(&program, &args, creds.password.as_deref())
    );

    let mut process = Command::new(&program);
    process.args(&args);

    let (code, output) = run_command(process, print_output).await.map_err(map_spawn_error)?;
    if code != 0 {
        let details =
            output.iter().filter(|line| line.starts_with("Error =")).cloned().collect();
        return Err(BcpRunError::NonZeroExit { code, details });
    }

    Ok(output)
}

/// Preflight probe that the bcp utility can be spawned at all.
pub async fn ensure_bcp_available(bcp_path: Option<&Path>) -> Result<(), BcpRunError> {
    let program =
        bcp_path.map(|path| path.display().to_string()).unwrap_or_else(|| "bcp".to_string());

    Command::new(program)
        .arg("-v")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(map_spawn_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_captures_output() {
        let mut command = Command::new("echo");
        command.arg("one line");
        let (code, output) = run_command(command, false).await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(output, vec!["one line".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_relays_exit_code() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo 'Error = nope' >&2; exit 3");
        let (code, output) = run_command(command, false).await.unwrap();
        assert_eq!(code, 3);
        assert_eq!(output, vec!["Error = nope".to_string()]);
    }

    #[tokio::test]
    async fn test_ensure_bcp_available_missing_binary() {
        let missing = Path::new("/definitely/not/here/bcp");
        let err = ensure_bcp_available(Some(missing)).await.unwrap_err();
        assert!(matches!(err, BcpRunError::BcpNotFound(_)));
    }
}
