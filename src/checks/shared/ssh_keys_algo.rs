//! SSH key algorithm strength check.

use async_trait::async_trait;
use base64::Engine;
use tracing::{debug, warn};

use crate::check::{Check, CheckContext, CheckError};

/// Minimum acceptable RSA modulus size in bits.
const MIN_RSA_BITS: usize = 2048;

/// Verifies that every SSH key pair in `~/.ssh` uses an algorithm of
/// sufficient strength: Ed25519 and ECDSA pass, DSA fails, RSA needs a
/// modulus of at least 2048 bits.
#[derive(Debug, Default)]
pub struct SshKeysAlgo {
    passed: bool,
    weak_key: String,
    details: String,
}

impl SshKeysAlgo {
    /// Create the check with no recorded outcome.
    pub fn new() -> Self {
        Self::default()
    }

    fn is_key_strong(&self, pub_content: &str) -> bool {
        let mut fields = pub_content.split_whitespace();
        let Some(algo) = fields.next() else {
            return false;
        };
        match algo {
            "ssh-ed25519" | "sk-ssh-ed25519@openssh.com" => true,
            "ecdsa-sha2-nistp256" | "ecdsa-sha2-nistp384" | "ecdsa-sha2-nistp521" => true,
            // DSA is considered weak outright.
            "ssh-dss" => false,
            "ssh-rsa" => {
                let Some(blob) = fields.next() else {
                    return false;
                };
                match rsa_modulus_bits(blob) {
                    Some(bits) => {
                        debug!(bits, "RSA key modulus");
                        bits >= MIN_RSA_BITS
                    }
                    None => {
                        warn!("failed to parse RSA public key blob");
                        false
                    }
                }
            }
            other => {
                warn!(key_type = other, "unknown key type");
                false
            }
        }
    }
}

/// Read one length-prefixed field from an SSH wire-format buffer.
fn read_field(buf: &[u8], offset: usize) -> Option<(&[u8], usize)> {
    let len_end = offset.checked_add(4)?;
    let len_bytes: [u8; 4] = buf.get(offset..len_end)?.try_into().ok()?;
    let len = usize::try_from(u32::from_be_bytes(len_bytes)).ok()?;
    let end = len_end.checked_add(len)?;
    Some((buf.get(len_end..end)?, end))
}

/// Bit length of the modulus inside a base64 `ssh-rsa` public key blob.
///
/// The blob is the wire encoding: algorithm name, public exponent, then
/// the modulus as an mpint with a possible leading zero byte.
fn rsa_modulus_bits(blob_b64: &str) -> Option<usize> {
    let blob = base64::engine::general_purpose::STANDARD
        .decode(blob_b64)
        .ok()?;

    let (algo, offset) = read_field(&blob, 0)?;
    if algo != b"ssh-rsa" {
        return None;
    }
    let (_exponent, offset) = read_field(&blob, offset)?;
    let (modulus, _offset) = read_field(&blob, offset)?;

    let significant: &[u8] = match modulus.iter().position(|&b| b != 0) {
        Some(first) => &modulus[first..],
        None => return Some(0),
    };
    let head_bits = 8usize.checked_sub(usize::try_from(significant[0].leading_zeros()).ok()?)?;
    significant
        .len()
        .checked_sub(1)?
        .checked_mul(8)?
        .checked_add(head_bits)
}

#[async_trait]
impl Check for SshKeysAlgo {
    fn name(&self) -> &'static str {
        "SSH keys have sufficient algorithm strength"
    }

    fn uuid(&self) -> &'static str {
        "ef69f752-0e89-46e2-a644-310429ae5f45"
    }

    async fn is_runnable(&mut self, ctx: &CheckContext) -> bool {
        let Ok(home) = ctx.system.home_dir() else {
            return false;
        };
        let ssh_dir = home.join(".ssh");
        if !ctx.system.path_exists(&ssh_dir).await {
            return false;
        }
        let Ok(names) = ctx.system.list_dir(&ssh_dir).await else {
            return false;
        };
        for name in &names {
            if let Some(stem) = name.strip_suffix(".pub") {
                if ctx.system.path_exists(&ssh_dir.join(stem)).await {
                    return true;
                }
            }
        }
        self.details = "No private keys found in the .ssh directory".to_owned();
        false
    }

    async fn run(&mut self, ctx: &CheckContext) -> Result<(), CheckError> {
        let home = ctx.system.home_dir()?;
        let ssh_dir = home.join(".ssh");
        let names = ctx.system.list_dir(&ssh_dir).await?;

        self.passed = true;
        for name in names {
            let Some(stem) = name.strip_suffix(".pub") else {
                continue;
            };
            if !ctx.system.path_exists(&ssh_dir.join(stem)).await {
                continue;
            }
            let content = match ctx.system.read_file(&ssh_dir.join(&name)).await {
                Ok(content) => content,
                Err(_) => continue,
            };
            if !self.is_key_strong(&content) {
                warn!(file = %name, "weak SSH key algorithm detected");
                self.passed = false;
                self.weak_key = stem.to_owned();
                break;
            }
        }
        Ok(())
    }

    fn passed(&self) -> bool {
        self.passed
    }

    fn passed_message(&self) -> &'static str {
        "SSH keys use strong encryption"
    }

    fn failed_message(&self) -> &'static str {
        "SSH keys are using weak encryption"
    }

    fn status(&self) -> String {
        if self.passed {
            return self.passed_message().to_owned();
        }
        if !self.details.is_empty() {
            return self.details.clone();
        }
        format!("SSH key {} is using weak encryption", self.weak_key)
    }
}
