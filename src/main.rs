// Sample driver for the hubfile client.
// Reads configuration from config.toml / HUBFILE_* and runs one command.

use std::path::Path;

use hubfile::{GitHubClient, HubError, Result};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: hubfile <readme | ls [dir] | cat <path> | upload <file> [path] | delete <path> | rate>";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let client = GitHubClient::from_env()?;

    if client.rate_limit_exceeded().await? {
        eprintln!("Rate limit has been exceeded - terminating...");
        return Ok(());
    }

    match args.as_slice() {
        [] | ["readme"] => match client.get_readme_content().await? {
            Some(text) => println!("{}", text),
            None => println!("No README found"),
        },
        ["ls", rest @ ..] => {
            let listing = match rest.first() {
                Some(dir) => client.get_contents_at(dir).await?,
                None => client.get_contents().await?,
            };
            for entry in listing.unwrap_or_default() {
                let url = entry.download_url.as_deref().unwrap_or("-");
                println!("{} [{}] [{}]", entry.name, entry.size, url);
            }
        }
        ["cat", path] => match client.get_file_contents(path).await? {
            Some(text) => print!("{}", text),
            None => println!("File not found"),
        },
        ["upload", file, rest @ ..] => {
            let commit = client
                .upload_content(Path::new(file), rest.first().copied())
                .await?;
            println!("File uploaded ({})", commit.commit.sha);
        }
        ["delete", path] => {
            if client.delete_content(path).await? {
                println!("File deleted");
            } else {
                println!("File not deleted");
            }
        }
        ["rate"] => {
            let rate = client.get_rate_limit().await?;
            println!("Rate Limit: {}\nRate Remaining: {}", rate.limit, rate.remaining);
        }
        _ => return Err(HubError::invalid(USAGE)),
    }

    Ok(())
}
