use std::convert::TryInto;
use std::path::PathBuf;
use std::{env, fs};

const PASSWORD_SALT: &str = "password.salt";
const TOKEN_SECRET: &str = "token.secret";

pub type Salt = [u8; 16];

/// Secret material backing password hashing and token signing.
///
/// Tokens are signed with HS256, so a single shared secret replaces the
/// public/private pair an asymmetric scheme would need.
#[derive(Debug, Clone)]
pub struct Security {
    pub salt: Salt,
    pub token_secret: Vec<u8>,
}

#[inline]
fn security_dir() -> PathBuf {
    PathBuf::from(env::var("SECURITY_DIR").unwrap_or("./security".to_string()))
}

impl Security {
    pub fn load() -> Security {
        let dir = security_dir();

        if cfg!(feature = "generate-security") {
            fs::create_dir_all(dir.clone())
                .expect("unable to create directory for storing security information");
        }

        tracing::info!("Loading password salt...");
        let mut salt: Option<Salt> = fs::read(dir.join(PASSWORD_SALT))
            .map(|s| s.try_into().ok())
            .ok()
            .flatten();

        match salt {
            None => {
                tracing::info!("Salt not found in '{}'.", dir.join(PASSWORD_SALT).display());
                if cfg!(feature = "generate-security") {
                    tracing::info!("Generating a new password salt.");
                    salt = Some(rand::random());

                    fs::write(dir.join(PASSWORD_SALT), salt.unwrap())
                        .expect("unable to write salt");
                }
            }
            Some(_) => tracing::info!("Salt found and loaded."),
        }

        tracing::info!("Loading token signing secret...");
        let token_secret = match fs::read(dir.join(TOKEN_SECRET)) {
            Ok(secret) if !secret.is_empty() => {
                tracing::info!("Loaded token signing secret.");
                secret
            }
            #[cfg(feature = "generate-security")]
            _ => {
                tracing::info!("Token secret missing or empty. Generating a new one.");
                let secret: [u8; 32] = rand::random();

                fs::write(dir.join(TOKEN_SECRET), secret)
                    .expect("unable to write token signing secret");

                secret.to_vec()
            }
            #[cfg(not(feature = "generate-security"))]
            _ => {
                panic!("Unable to load token signing secret.");
            }
        };

        Security {
            salt: salt.expect("password salt is missing and generation is disabled"),
            token_secret,
        }
    }
}

#[cfg(test)]
impl Security {
    /// Fixed material for tests that only need deterministic hashing/signing.
    pub fn fixed() -> Security {
        Security {
            salt: [7u8; 16],
            token_secret: b"test-token-secret-test-token-sec".to_vec(),
        }
    }
}
