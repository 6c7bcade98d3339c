use std::fs;
use std::path::Path;
use anyhow::{Context, Error, format_err};
use base64::{engine::general_purpose, Engine as _};
use serde::{Serialize, Deserialize};
use crate::errors;

pub fn load_toml<T, P: AsRef<Path>>(path: P) -> Result<T, Error> where for<'a> T: Deserialize<'a> {
    let text = fs::read_to_string(path.as_ref())
                   .with_context(|| format!("can't read {}", path.as_ref().display()))?;
    toml::from_str(&text)
         .map_err(|e| format_err!("invalid TOML content in {}: {}", path.as_ref().display(), e))
}

pub fn save_toml<T, P: AsRef<Path>>(data: &T, path: P) -> Result<(), Error> where T: Serialize {
    let text = toml::to_string(data).context("can't serialize to TOML")?;
    fs::write(path.as_ref(), text)
        .with_context(|| format!("can't write {}", path.as_ref().display()))?;
    Ok(())
}

pub fn encode_b64(text: &str) -> String {
    general_purpose::STANDARD.encode(text)
}

pub fn decode_b64(data: &str) -> errors::Result<String> {
    let bytes = general_purpose::STANDARD.decode(data)?;
    String::from_utf8(bytes)
        .map_err(|_| errors::Error::IllegalState("decoded field is not valid UTF-8".to_string()))
}
