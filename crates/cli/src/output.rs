use crate::error::CliError;
use engine_processing::TransferResult;

pub async fn write_result(result: &TransferResult, path: &str) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(result)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

pub fn print_result(result: &TransferResult) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}
