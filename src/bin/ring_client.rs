use std::env;
use std::io::Write;

use anyhow::{anyhow, Result};
use env_logger::Env;
use tokio::io::{AsyncBufReadExt, BufReader};

use chord_ring::client::RingClient;
use chord_ring::config::ClientConfig;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(e) = run().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn prompt(text: &str) -> Result<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}

async fn run() -> Result<()> {
    let config = ClientConfig::from_args(env::args().skip(1))?;
    let mut client = RingClient::connect(&config.host, config.port).await?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("Please select an option:");
        println!("1) Enter the filename to store:");
        println!("2) Enter the filename to retrieve:");
        println!("3) Exit:");
        prompt("Please select an option: ")?;

        let Some(choice) = input.next_line().await? else {
            break;
        };
        match choice.trim() {
            "1" => {
                prompt("Enter the filename to store: ")?;
                let filename = read_filename(&mut input).await?;
                println!("{}", client.store(&filename).await?);
            }
            "2" => {
                prompt("Enter the filename to retrieve: ")?;
                let filename = read_filename(&mut input).await?;
                println!("{}", client.retrieve(&filename).await?);
            }
            "3" => {
                println!("Exiting.");
                break;
            }
            _ => println!("Invalid option. Please try again."),
        }
    }
    client.exit().await
}

async fn read_filename<R: tokio::io::AsyncBufRead + Unpin>(
    input: &mut tokio::io::Lines<R>,
) -> Result<String> {
    let filename = input
        .next_line()
        .await?
        .ok_or_else(|| anyhow!("Input closed"))?;
    Ok(filename.trim().to_owned())
}
