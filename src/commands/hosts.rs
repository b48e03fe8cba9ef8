//! `hosts` and `ip` commands

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::{host_name, human_host_name, Context};
use crate::api::Host;
use crate::common::{capitalize, human_size, ram_in_bytes, Result};
use crate::config::defaults::VALID_SIZES;

const MIN_COLUMN_WIDTH: usize = 20;
const COLUMN_PADDING: usize = 3;

/// Render hosts as a `NAME SIZE IP` table with padded columns
pub fn render_hosts_table(hosts: &[Host]) -> String {
    let rows: Vec<[String; 3]> = std::iter::once(["NAME".to_string(), "SIZE".to_string(), "IP".to_string()])
        .chain(hosts.iter().map(|host| {
            [
                host.name.clone(),
                human_size(host.size.saturating_mul(1024 * 1024)),
                host.ip_address.clone(),
            ]
        }))
        .collect();

    let width = |col: usize| {
        rows.iter()
            .map(|row| row[col].len() + COLUMN_PADDING)
            .max()
            .unwrap_or(0)
            .max(MIN_COLUMN_WIDTH)
    };
    let (name_width, size_width) = (width(0), width(1));

    rows.iter()
        .map(|[name, size, ip]| format!("{:<name_width$}{:<size_width$}{}\n", name, size, ip))
        .collect()
}

/// `hosts` / `hosts ls`
pub async fn run_hosts(ctx: &Context) -> Result<()> {
    let client = ctx.api_client().await?;
    let hosts = client.get_hosts().await?;
    debug!("Listed {} hosts", hosts.len());

    print!("{}", render_hosts_table(&hosts));
    Ok(())
}

/// Parse a `-m` size into whole MiB, or `None` if it is not usable
fn host_size_mb(size: &str) -> Option<i64> {
    let megs = ram_in_bytes(size).ok()? / (1024 * 1024);
    (megs >= 1).then_some(megs)
}

/// `hosts create [-m SIZE] [NAME]`
pub async fn run_create_host(ctx: &Context, name: Option<&str>, size: &str) -> Result<()> {
    let host_name = host_name(name);
    let human_name = capitalize(&human_host_name(&host_name));

    let Some(size_mb) = host_size_mb(size) else {
        eprintln!("Sorry, {:?} isn't a size we support.\nValid sizes are {}.", size, VALID_SIZES);
        return Ok(());
    };

    let client = ctx.api_client().await?;
    match client.create_host(&host_name, size_mb).await {
        Ok(host) => {
            eprintln!("{} running at {}", human_name, host.ip_address);
            Ok(())
        }
        Err(e) if e.api_body_contains("already exists") => {
            eprintln!(
                "{} is already running.\nYou can create additional hosts with `orchard hosts create [NAME]`.",
                human_name
            );
            Ok(())
        }
        Err(e) if e.api_body_contains("Invalid value") => {
            eprintln!(
                "Sorry, '{}' isn't a valid host name.\nHost names can only contain lowercase letters, numbers and underscores.",
                host_name
            );
            Ok(())
        }
        Err(e) if e.api_body_contains("Unsupported size") => {
            eprintln!("Sorry, {:?} isn't a size we support.\nValid sizes are {}.", size, VALID_SIZES);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn confirm(question: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut answer).await?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// `hosts rm [-f] [NAME]`
pub async fn run_remove_host(ctx: &Context, name: Option<&str>, force: bool) -> Result<()> {
    let host_name = host_name(name);
    let human_name = human_host_name(&host_name);

    if !force {
        println!("Going to remove {}. All data on it will be lost.", human_name);
        if !confirm("Are you sure you're ready? [yN] ").await? {
            return Ok(());
        }
    }

    let client = ctx.api_client().await?;
    match client.delete_host(&host_name).await {
        Ok(()) => {
            eprintln!("Removed {}", human_name);
            Ok(())
        }
        Err(e) if e.api_body_contains("Not found") => {
            eprintln!(
                "{} doesn't seem to be running.\nYou can view your running hosts with `orchard hosts`.",
                capitalize(&human_name)
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// `ip [NAME]`
pub async fn run_ip(ctx: &Context, name: Option<&str>) -> Result<()> {
    let host = ctx.get_host(&host_name(name)).await?;
    println!("{}", host.ip_address);
    Ok(())
}
