use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    bufferqueue::app::startup::startup().await
}
