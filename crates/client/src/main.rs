mod models;

use colored::*;
use models::*;
use std::env;
use std::io::{self, Write};

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

// ===== Main =====

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let backend_url =
        env::var("QUICKPOLL_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
    let api = Api::new(backend_url);

    println!("{}", "=".repeat(60).bright_cyan());
    println!("{}", "    🗳️  QUICKPOLL 🗳️".bright_yellow().bold());
    println!("{}", "=".repeat(60).bright_cyan());
    println!();

    menu_loop(&api).await
}

// ===== Menu Loop =====

async fn menu_loop(api: &Api) -> anyhow::Result<()> {
    loop {
        println!(
            "{}",
            "[C]reate poll  [V]ote  [R]esults  [Q]uit".bright_black()
        );
        let choice = prompt("> ")?.to_lowercase();

        let outcome = match choice.as_str() {
            "c" | "create" => create_poll(api).await,
            "v" | "vote" => vote(api).await,
            "r" | "results" => show_results(api).await,
            "q" | "quit" => {
                println!();
                println!("{}", "Thanks for voting! 👋".bright_cyan().bold());
                return Ok(());
            }
            _ => {
                println!("{}", "Invalid choice. Please try again.".red());
                continue;
            }
        };

        if let Err(e) = outcome {
            eprintln!("{} {}", "❌".red(), e);
        }
        println!();
    }
}

async fn create_poll(api: &Api) -> anyhow::Result<()> {
    let title = prompt("Title: ")?;
    let description = optional(prompt("Description (optional): ")?);
    let options = parse_options(&prompt("Options (comma separated): ")?);
    let expires_at = optional(prompt("Expires at, e.g. 2025-06-01T18:00:00Z (optional): ")?);
    let passcode = optional(prompt("Passcode (optional): ")?);

    let poll_id = api
        .create_poll(&CreatePollRequest {
            title,
            description,
            expires_at,
            options,
            passcode,
        })
        .await?;

    println!("{}", "✓ Poll created".green());
    println!("{} {}", "Poll id:".bright_black(), poll_id.bright_white().bold());
    Ok(())
}

async fn vote(api: &Api) -> anyhow::Result<()> {
    let poll_id = prompt("Poll id: ")?;
    let options = api.options(&poll_id).await?;
    if options.is_empty() {
        anyhow::bail!("No poll found with id {poll_id}");
    }

    for (i, option) in options.iter().enumerate() {
        println!("  {} {}", format!("[{}]", i + 1).bright_cyan(), option.text);
    }

    let Some(option) = pick(&prompt("Your choice: ")?, &options) else {
        anyhow::bail!("Not a valid choice");
    };

    let voter = api.vote(&poll_id, option.id).await?;
    println!("{} {}", "✓ Voted for".green(), option.text.bright_white().bold());
    println!("{} {}", "Voter id:".bright_black(), voter.bright_black());
    Ok(())
}

async fn show_results(api: &Api) -> anyhow::Result<()> {
    let poll_id = prompt("Poll id: ")?;
    let results = api.results(&poll_id).await?;

    println!();
    println!("{}", "=".repeat(60).bright_cyan());
    println!("    📊 {}", results.title.bright_yellow().bold());
    println!("{}", "=".repeat(60).bright_cyan());
    println!();

    for (i, option) in results.results.iter().enumerate() {
        println!(
            "{}. {} ({} votes)",
            (i + 1).to_string().bright_cyan(),
            option.text.bright_white().bold(),
            option.vote_count.to_string().yellow(),
        );
    }

    println!();
    println!(
        "{} {}   {} {}",
        "Total:".bright_black(),
        results.total_votes.to_string().bright_cyan(),
        "Last vote:".bright_black(),
        results.last_vote_label
    );
    if results.is_expired {
        println!("{}", "This poll has ended.".red());
    } else {
        println!("{} {}", "Time left:".bright_black(), results.remaining_label.green());
    }
    Ok(())
}

// ===== Input =====

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label.bright_green().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn optional(input: String) -> Option<String> {
    if input.is_empty() { None } else { Some(input) }
}

fn parse_options(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves a 1-based menu number to an option.
fn pick<'a>(input: &str, options: &'a [PollOption]) -> Option<&'a PollOption> {
    let index: usize = input.trim().parse().ok()?;
    options.get(index.checked_sub(1)?)
}

// ===== API Calls =====

struct Api {
    client: reqwest::Client,
    base_url: String,
}

impl Api {
    fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn create_poll(&self, request: &CreatePollRequest) -> anyhow::Result<String> {
        let response = self
            .client
            .post(format!("{}/polls", self.base_url))
            .json(request)
            .send()
            .await?;

        let created: CreatePollResponse = checked(response, "Create failed").await?.json().await?;
        Ok(created.poll_id)
    }

    async fn options(&self, poll_id: &str) -> anyhow::Result<Vec<PollOption>> {
        let response = self
            .client
            .get(format!("{}/polls/{}/options", self.base_url, poll_id))
            .send()
            .await?;

        Ok(checked(response, "API error").await?.json().await?)
    }

    async fn vote(&self, poll_id: &str, poll_option_id: i64) -> anyhow::Result<String> {
        let response = self
            .client
            .post(format!("{}/polls/{}/vote", self.base_url, poll_id))
            .json(&VoteRequest { poll_option_id })
            .send()
            .await?;

        let voted: VoteResponse = checked(response, "Vote failed").await?.json().await?;
        Ok(voted.voter_identifier)
    }

    async fn results(&self, poll_id: &str) -> anyhow::Result<PollResults> {
        let response = self
            .client
            .get(format!("{}/polls/{}/results", self.base_url, poll_id))
            .send()
            .await?;

        Ok(checked(response, "API error").await?.json().await?)
    }
}

async fn checked(response: reqwest::Response, context: &str) -> anyhow::Result<reqwest::Response> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await?;
        anyhow::bail!("{} ({}): {}", context, status, text);
    }
    Ok(response)
}
