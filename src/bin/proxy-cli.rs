use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Client CLI for the allowlist forwarding proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    proxy: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy liveness
    Health,
    /// Fetch a target through the proxy
    Get {
        /// Target URL; its hostname must be allowlisted
        url: String,
    },
    /// Post a body to a target through the proxy
    Post {
        /// Target URL; its hostname must be allowlisted
        url: String,
        #[arg(short, long, default_value = "")]
        data: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder().no_proxy().build()?;
    let base = cli.proxy.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/healthz", base)).send().await?,
        Commands::Get { url } => {
            client
                .get(format!("{}/", base))
                .query(&[("url", url)])
                .send()
                .await?
        }
        Commands::Post { url, data } => {
            client
                .post(format!("{}/", base))
                .query(&[("url", url)])
                .body(data)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let limit = res
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        eprint!("{}", text);
        std::process::exit(1);
    }

    if let Some(remaining) = limit {
        eprintln!("Rate limit remaining: {}", remaining);
    }
    print!("{}", text);
    Ok(())
}
