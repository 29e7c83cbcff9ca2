use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_spendscore_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthState {
    pub auth_token: Option<String>,
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_spendscore_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    load_auth_from(&auth_path()?)
}

fn load_auth_from(p: &Path) -> Result<AuthState> {
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

fn save_auth_to(p: &Path, auth: &AuthState) -> Result<()> {
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn set_token(token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("token is empty");
    }
    let p = auth_path()?;
    save_auth_to(
        &p,
        &AuthState {
            auth_token: Some(token.to_string()),
        },
    )?;
    println!("Saved auth token to {}", p.display());
    Ok(())
}

pub fn clear_token() -> Result<()> {
    let p = auth_path()?;
    save_auth_to(&p, &AuthState::default())?;
    println!("Cleared auth token in {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("auth.json");
        assert_eq!(load_auth_from(&p).unwrap(), AuthState::default());

        let state = AuthState {
            auth_token: Some("abc".to_string()),
        };
        save_auth_to(&p, &state).unwrap();
        assert_eq!(load_auth_from(&p).unwrap(), state);
        assert!(fs::read_to_string(&p).unwrap().contains("\"auth_token\""));
    }
}
