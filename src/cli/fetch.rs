use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::fetcher::{Fetcher, QueryType};

pub async fn run(query: &str, config_path: Option<String>, no_cache: bool) -> Result<()> {
    let query: QueryType = query.parse()?;
    let config = Config::load_with_path(config_path)?;
    if no_cache {
        info!("CLI override: cache disabled");
    }

    let fetcher = Fetcher::from_config(&config.fetch, !no_cache)?;
    let data = fetcher.query(query).await?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_unknown_query() {
        let err = run("releases", None, true).await.unwrap_err();
        assert!(err.to_string().contains("Unknown query type"));
    }
}
