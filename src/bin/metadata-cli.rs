use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use mesh_metadata::transport::{codec, CUSTOM_METADATA};
use mesh_metadata::MetadataMap;

#[derive(Parser)]
#[command(name = "metadata-cli")]
#[command(about = "Metadata header codec and admin CLI for the metadata gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON string map into a metadata header value
    Encode { json: String },
    /// Decode a metadata header value into a JSON string map
    Decode { value: String },
    /// Check gateway status
    Status,
    /// Show static metadata loaded by the gateway
    Static,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { json } => {
            let map: MetadataMap = serde_json::from_str(&json)?;
            println!("{}", codec::encode(&map));
        }
        Commands::Decode { value } => {
            let map = codec::decode(&CUSTOM_METADATA, &value);
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        Commands::Status => admin_get(&cli.url, &cli.key, "/admin/status").await?,
        Commands::Static => admin_get(&cli.url, &cli.key, "/admin/metadata").await?,
    }

    Ok(())
}

async fn admin_get(url: &str, key: &str, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);

    let res = reqwest::Client::new()
        .get(format!("{url}{path}"))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
