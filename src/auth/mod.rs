//! API authentication and token caching
//!
//! Tokens are cached per API URL under the token directory so the user signs
//! in once per API. Older clients wrote the token file as JSON
//! (`{"token": "..."}`); both forms are read.

use log::{debug, info};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::api::ApiClient;
use crate::common::{ProxyError, Result};
use crate::config::ClientConfig;

#[derive(Deserialize)]
struct TokenFile {
    token: String,
}

/// Path of the cached token for `base_url` inside `token_dir`
pub fn token_file_path(token_dir: &Path, base_url: &str) -> PathBuf {
    let hash = Sha256::digest(base_url.as_bytes());
    token_dir.join(format!("{:x}", hash))
}

/// Read a cached token, accepting plain-text and JSON token files
///
/// # Errors
///
/// Returns an error if the file cannot be read, holds malformed JSON, or
/// is empty.
pub fn read_token_file(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)?;
    let content = content.trim();

    let token = if content.starts_with('{') {
        serde_json::from_str::<TokenFile>(content)
            .map_err(|e| ProxyError::Auth(format!("Malformed token file {}: {}", path.display(), e)))?
            .token
    } else {
        content.to_string()
    };

    if token.is_empty() {
        return Err(ProxyError::Auth(format!("Token file {} is empty", path.display())));
    }
    Ok(token)
}

/// Write a token file readable only by the current user
pub fn write_token_file(path: &Path, token: &str) -> Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(token.as_bytes())?;
    Ok(())
}

/// Create the token directory with owner-only permissions
fn ensure_token_dir(token_dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(token_dir)
        .map_err(|e| ProxyError::Auth(format!("Failed to create token directory {}: {}", token_dir.display(), e)))
}

/// Ask for a username on stdin and a password without echo
pub fn prompt_credentials() -> Result<(String, String)> {
    print!("Orchard username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().lock().read_line(&mut username)?;

    let password = rpassword::prompt_password("Password: ")?;
    Ok((username.trim().to_string(), password))
}

/// Return an API client with a token, signing in if none is cached
pub async fn authenticate(config: &ClientConfig) -> Result<ApiClient> {
    authenticate_with(config, || async {
        tokio::task::spawn_blocking(prompt_credentials)
            .await
            .map_err(|e| ProxyError::Other(format!("Prompt failed: {}", e)))?
    })
    .await
}

/// Like [`authenticate`], with the credential prompt supplied by the caller
///
/// `prompt` is only called when no token is cached for the API URL.
pub async fn authenticate_with<F, Fut>(config: &ClientConfig, prompt: F) -> Result<ApiClient>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<(String, String)>>,
{
    let mut client = ApiClient::new(&config.api_url, "")?;

    ensure_token_dir(&config.token_dir)?;
    let token_file = token_file_path(&config.token_dir, client.base_url());

    if token_file.exists() {
        debug!("Using cached token {}", token_file.display());
        client.set_token(read_token_file(&token_file)?);
        return Ok(client);
    }

    let (username, password) = prompt().await?;
    if username.is_empty() {
        return Err(ProxyError::Auth("No username given".to_string()));
    }

    let token = client.get_auth_token(&username, &password).await?;
    write_token_file(&token_file, &token)?;
    info!("Signed in as {}", username);

    client.set_token(token);
    Ok(client)
}
