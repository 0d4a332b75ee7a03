use std::time::Duration;

use crossfetch::{Client, RequestConfig, RetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("CROSSFETCH_URL")?;

    let client = Client::from_env().map_err(anyhow::Error::msg)?;

    let retry = RetryConfig::default()
        .with_max_retries(5)
        .with_on_retry_attempt(|failure| {
            eprintln!(
                "attempt failed (status {:?}), retrying",
                failure.status()
            );
            Ok(())
        });

    let response = client
        .request(
            RequestConfig::get(url)
                .param("source", "crossfetch-demo")
                .timeout(Duration::from_secs(5))
                .retry_config(retry),
        )
        .await?;

    println!("{} {:?}", response.status, response.data);

    Ok(())
}
